//! Walks a pandoc JSON document and replaces every code block with the
//! blocks the renderer produces for it.
//!
//! Only the document body is walked. Code blocks may sit at any depth
//! (inside quotes, lists, divs, table cells); replacements are spliced in
//! place and are not walked again.

use crate::ast::{CodeBlock, Document};
use crate::config::Config;
use crate::listing::{LISTING_HEADER, add_header_include};
use crate::renderer::{OutputFormat, RenderContext};
use serde_json::Value;
use std::io::{Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Failed to read the document: {0}")]
    Read(#[source] std::io::Error),

    #[error("Input is not a pandoc JSON document: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Malformed code block: {0}")]
    MalformedCodeBlock(#[source] serde_json::Error),

    #[error("Failed to write the document: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to serialize the document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Reads a document from `input`, filters it and writes it to `output`.
pub fn run_filter<R: Read, W: Write>(
    input: R,
    output: W,
    config: Config,
    format: OutputFormat,
) -> Result<(), FilterError> {
    let mut input = input;
    let mut buffer = String::new();
    input.read_to_string(&mut buffer).map_err(FilterError::Read)?;
    let document: Document = serde_json::from_str(&buffer).map_err(FilterError::Parse)?;

    let mut ctx = RenderContext::new(config, format);
    let document = filter_document(document, &mut ctx)?;

    let mut output = output;
    serde_json::to_writer(&mut output, &document).map_err(FilterError::Serialize)?;
    output.flush().map_err(FilterError::Write)
}

/// Filters an already parsed document.
pub fn filter_document(mut document: Document, ctx: &mut RenderContext) -> Result<Document, FilterError> {
    document.blocks = walk_list(std::mem::take(&mut document.blocks), ctx)?;
    log::debug!("Rendered {} numbered listing(s)", ctx.captions().count());

    if ctx.caption_found() && ctx.format().is_latex() {
        add_header_include(&mut document.meta, LISTING_HEADER);
    }
    Ok(document)
}

fn walk_list(items: Vec<Value>, ctx: &mut RenderContext) -> Result<Vec<Value>, FilterError> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match CodeBlock::from_node(&item).map_err(FilterError::MalformedCodeBlock)? {
            Some(block) => {
                for rendered in ctx.render(block) {
                    out.push(rendered.to_value().map_err(FilterError::Serialize)?);
                }
            }
            None => out.push(walk_value(item, ctx)?),
        }
    }
    Ok(out)
}

fn walk_value(value: Value, ctx: &mut RenderContext) -> Result<Value, FilterError> {
    Ok(match value {
        Value::Array(items) => Value::Array(walk_list(items, ctx)?),
        Value::Object(map) => {
            let mut walked = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                walked.insert(key, walk_value(child, ctx)?);
            }
            Value::Object(walked)
        }
        other => other,
    })
}

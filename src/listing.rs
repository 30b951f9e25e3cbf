//! Captioned listings: numbering, caption text and the wrapper nodes.

use crate::ast::{Attr, Block, Inline, text_inlines};
use serde_json::{Map, Value, json};

/// LaTeX preamble that provides the `codelisting` float.
pub const LISTING_HEADER: &str = r"%
\makeatletter
\@ifpackageloaded{caption}{}{\usepackage{caption}}
\@ifpackageloaded{cleveref}{}{\usepackage{cleveref}}
\@ifundefined{codelisting}{%
    \DeclareCaptionType{codelisting}[Code Listing][List of Code Listings]
    \crefname{codelisting}{code listing}{code listings}
    \Crefname{codelisting}{Code Listing}{Code Listings}
    \captionsetup[codelisting]{position=bottom}
}{}
\makeatother
";

/// Number of listings issued so far in one conversion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptionState {
    counter: usize,
}

impl CaptionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next listing number.
    pub fn next_number(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }

    pub fn count(&self) -> usize {
        self.counter
    }
}

/// Caption placement relative to the listing body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Above,
    Below,
}

/// A listing ready to be wrapped around its inner blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// `None` for unnumbered listings.
    pub number: Option<usize>,
    pub label: Option<String>,
    /// Caption body as LaTeX.
    pub caption: String,
    /// Caption for the list of listings, as LaTeX.
    pub short_caption: String,
    /// Caption body as plain text, for non-LaTeX output.
    pub plain_caption: String,
    pub placement: Placement,
}

impl Listing {
    pub fn wrap_latex(&self, inner: Vec<Block>) -> Vec<Block> {
        let caption = match (self.number, &self.label) {
            (Some(_), Some(label)) => format!(
                "\\caption[{}]{{\\label{{{label}}}{}}}",
                self.short_caption, self.caption
            ),
            (Some(_), None) => format!("\\caption[{}]{{{}}}", self.short_caption, self.caption),
            (None, Some(label)) => format!("\\caption*{{\\label{{{label}}}{}}}", self.caption),
            (None, None) => format!("\\caption*{{{}}}", self.caption),
        };
        let mut blocks = vec![Block::raw_tex(r"\begin{codelisting}[hbtp]")];
        blocks.extend(self.place(Block::raw_tex(caption), inner));
        blocks.push(Block::raw_tex(r"\end{codelisting}"));
        blocks
    }

    pub fn wrap_generic(&self, inner: Vec<Block>) -> Vec<Block> {
        let mut caption = Vec::new();
        if let Some(number) = self.number {
            caption.push(Inline::Str("Listing".to_string()));
            caption.push(Inline::Space);
            caption.push(Inline::Str(format!("{number}:")));
        }
        let text = text_inlines(&self.plain_caption);
        if !caption.is_empty() && !text.is_empty() {
            caption.push(Inline::Space);
        }
        caption.extend(text);

        let blocks = self.place(Block::Para(vec![Inline::Emph(caption)]), inner);
        let identifier = self.label.clone().unwrap_or_default();
        vec![Block::Div(Attr::new(identifier, vec!["codelisting".to_string()], Vec::new()), blocks)]
    }

    fn place(&self, caption: Block, inner: Vec<Block>) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(inner.len() + 1);
        match self.placement {
            Placement::Above => {
                blocks.push(caption);
                blocks.extend(inner);
            }
            Placement::Below => {
                blocks.extend(inner);
                blocks.push(caption);
            }
        }
        blocks
    }
}

/// Escapes LaTeX specials; backtick spans become `\texttt{...}`.
pub fn latex_caption(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, part) in text.split('`').enumerate() {
        // Odd parts sit between backticks. An unmatched backtick leaves a
        // trailing odd part, which is still typeset as code.
        if i % 2 == 1 {
            out.push_str("\\texttt{");
            out.push_str(&escape_latex(part));
            out.push('}');
        } else {
            out.push_str(&escape_latex(part));
        }
    }
    out
}

pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '{' | '}' | '$' | '&' | '#' | '_' | '%' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str(r"\textasciicircum{}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Appends a raw LaTeX entry to the document's `header-includes`.
pub fn add_header_include(meta: &mut Map<String, Value>, latex: &str) {
    let entry = json!({
        "t": "MetaInlines",
        "c": [{"t": "RawInline", "c": ["tex", latex]}]
    });
    match meta.get_mut("header-includes") {
        Some(Value::Object(existing)) if existing.get("t").and_then(Value::as_str) == Some("MetaList") => {
            match existing.get_mut("c") {
                Some(Value::Array(items)) => items.push(entry),
                _ => {
                    existing.insert("c".to_string(), Value::Array(vec![entry]));
                }
            }
        }
        Some(existing) => {
            let previous = existing.take();
            *existing = json!({"t": "MetaList", "c": [previous, entry]});
        }
        None => {
            meta.insert("header-includes".to_string(), json!({"t": "MetaList", "c": [entry]}));
        }
    }
}

//! A pandoc JSON filter that displays, runs and captions source code.
//!
//! Pandoc pipes the document AST through the filter's stdin and reads the
//! rewritten AST back from stdout. Every code block may pull its source from
//! a file, show a subset of its lines, run through an interpreter with the
//! output appended, replay a Python session, or become a numbered listing.

pub mod ast;
pub mod config;
pub mod directive;
pub mod executor;
pub mod file_resolver;
pub mod filter;
pub mod interactive;
pub mod language;
pub mod line_selector;
pub mod listing;
pub mod plot;
pub mod renderer;

pub use crate::config::Config;
pub use crate::filter::{FilterError, filter_document, run_filter};
pub use crate::renderer::{OutputFormat, RenderContext};

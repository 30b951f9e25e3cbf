//! The subset of pandoc's JSON AST this filter reads and produces.
//!
//! Nodes the filter never touches stay as raw [`serde_json::Value`]s and are
//! written back untouched. Only code blocks are decoded, and only the node
//! kinds the renderer emits have typed constructors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A whole pandoc document as handed to a JSON filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "pandoc-api-version")]
    pub api_version: Vec<u32>,
    pub meta: Map<String, Value>,
    pub blocks: Vec<Value>,
}

/// `[identifier, [classes], [[key, value], ...]]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr(pub String, pub Vec<String>, pub Vec<(String, String)>);

impl Attr {
    pub fn new(identifier: impl Into<String>, classes: Vec<String>, attributes: Vec<(String, String)>) -> Self {
        Self(identifier.into(), classes, attributes)
    }

    pub fn with_class(class: impl Into<String>) -> Self {
        Self(String::new(), vec![class.into()], Vec::new())
    }

    pub fn identifier(&self) -> &str {
        &self.0
    }

    pub fn classes(&self) -> &[String] {
        &self.1
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.2
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.1.iter().any(|c| c == class)
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.2.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// `[url, title]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target(pub String, pub String);

/// Block nodes the renderer can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Block {
    CodeBlock(Attr, String),
    RawBlock(String, String),
    Para(Vec<Inline>),
    Div(Attr, Vec<Block>),
}

/// Inline nodes the renderer can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Inline {
    Str(String),
    Space,
    Emph(Vec<Inline>),
    Code(Attr, String),
    Image(Attr, Vec<Inline>, Target),
    RawInline(String, String),
}

impl Block {
    pub fn raw_tex(text: impl Into<String>) -> Self {
        Block::RawBlock("tex".to_string(), text.into())
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Splits prose on whitespace into `Str`/`Space` inlines.
pub fn text_inlines(text: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    for word in text.split_whitespace() {
        if !inlines.is_empty() {
            inlines.push(Inline::Space);
        }
        inlines.push(Inline::Str(word.to_string()));
    }
    inlines
}

/// A code block decoded from a raw node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub attr: Attr,
    pub text: String,
}

impl CodeBlock {
    /// Returns `Ok(None)` for nodes that are not code blocks and an error for
    /// code blocks whose content does not have pandoc's shape.
    pub fn from_node(node: &Value) -> Result<Option<Self>, serde_json::Error> {
        if node.get("t").and_then(Value::as_str) != Some("CodeBlock") {
            return Ok(None);
        }
        let content = node.get("c").cloned().unwrap_or(Value::Null);
        let (attr, text): (Attr, String) = serde_json::from_value(content)?;
        Ok(Some(Self { attr, text }))
    }

    pub fn into_block(self) -> Block {
        Block::CodeBlock(self.attr, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_code_block() {
        let node = json!({
            "t": "CodeBlock",
            "c": [["id", ["python", "exec"], [["lines", "1-2"]]], "print(1)"]
        });
        let block = CodeBlock::from_node(&node).unwrap().unwrap();
        assert_eq!(block.attr.identifier(), "id");
        assert!(block.attr.has_class("exec"));
        assert_eq!(block.attr.get("lines"), Some("1-2"));
        assert_eq!(block.text, "print(1)");
    }

    #[test]
    fn test_non_code_block_is_skipped() {
        let node = json!({"t": "Para", "c": []});
        assert!(CodeBlock::from_node(&node).unwrap().is_none());
    }

    #[test]
    fn test_malformed_code_block_is_an_error() {
        let node = json!({"t": "CodeBlock", "c": ["oops"]});
        assert!(CodeBlock::from_node(&node).is_err());
    }

    #[test]
    fn test_block_serialization_matches_pandoc() {
        let para = Block::Para(vec![Inline::Emph(vec![Inline::Str("Output:".into())]), Inline::Space]);
        assert_eq!(
            para.to_value().unwrap(),
            json!({"t": "Para", "c": [{"t": "Emph", "c": [{"t": "Str", "c": "Output:"}]}, {"t": "Space"}]})
        );

        let raw = Block::raw_tex(r"\end{codelisting}");
        assert_eq!(raw.to_value().unwrap(), json!({"t": "RawBlock", "c": ["tex", "\\end{codelisting}"]}));
    }

    #[test]
    fn test_document_round_trip_keeps_meta_order() {
        let input = json!({
            "pandoc-api-version": [1, 23, 1],
            "meta": {"zeta": {"t": "MetaBool", "c": true}, "alpha": {"t": "MetaString", "c": "x"}},
            "blocks": []
        });
        let doc: Document = serde_json::from_value(input.clone()).unwrap();
        let keys: Vec<_> = doc.meta.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(serde_json::to_value(&doc).unwrap(), input);
    }

    #[test]
    fn test_text_inlines() {
        assert_eq!(
            text_inlines("Listing 1:  hi"),
            vec![
                Inline::Str("Listing".into()),
                Inline::Space,
                Inline::Str("1:".into()),
                Inline::Space,
                Inline::Str("hi".into())
            ]
        );
        assert!(text_inlines("   ").is_empty());
    }
}

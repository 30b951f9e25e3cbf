//! Language tags and the built-in interpreter table.
//!
//! Tags are matched exactly (no case folding). Anything outside the table
//! is [`Language::Unknown`] and runs through `cat`.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Command used for languages without an interpreter entry.
pub const FALLBACK_COMMAND: &str = "cat";

static PYTHON_IMPORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?:import|from)\s").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    Perl,
    Php,
    Python,
    Python2,
    Python3,
    Ruby,
    Unknown(String),
}

impl Language {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "perl" => Self::Perl,
            "php" => Self::Php,
            "python" => Self::Python,
            "python2" => Self::Python2,
            "python3" => Self::Python3,
            "ruby" => Self::Ruby,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Perl => "perl",
            Self::Php => "php",
            Self::Python => "python",
            Self::Python2 => "python2",
            Self::Python3 => "python3",
            Self::Ruby => "ruby",
            Self::Unknown(tag) => tag,
        }
    }

    pub fn is_python(&self) -> bool {
        matches!(self, Self::Python | Self::Python2 | Self::Python3)
    }

    /// Built-in `-c`-style invocation, if the language has one.
    pub fn builtin_command(&self) -> Option<&'static str> {
        match self {
            Self::Perl => Some("perl -e"),
            Self::Php => Some("php -r"),
            Self::Python | Self::Python3 => Some("python3 -c"),
            Self::Python2 => Some("python2 -c"),
            Self::Ruby => Some("ruby -e"),
            Self::Unknown(_) => None,
        }
    }

    /// Pattern matching import lines, defined for the Python family only.
    pub fn import_pattern(&self) -> Option<&'static Regex> {
        self.is_python().then(|| &*PYTHON_IMPORT)
    }
}

/// Interpreter lookup: user overrides first, then built-ins, then `cat`.
#[derive(Debug, Clone, Default)]
pub struct InterpreterTable {
    overrides: BTreeMap<String, String>,
}

impl InterpreterTable {
    pub fn new(overrides: BTreeMap<String, String>) -> Self {
        Self { overrides }
    }

    pub fn command_for(&self, language: &Language) -> String {
        if let Some(command) = self.overrides.get(language.tag()) {
            return command.clone();
        }
        language.builtin_command().unwrap_or(FALLBACK_COMMAND).to_string()
    }
}

/// Removes import lines from `code` and trims the blank lines left at
/// either end. Languages without an import pattern are returned as-is.
pub fn remove_import_statements(code: &str, language: &Language) -> String {
    let Some(pattern) = language.import_pattern() else {
        log::warn!("hideimports is not supported for language '{}'", language.tag());
        return code.to_string();
    };

    let kept: Vec<&str> = code.lines().filter(|line| !pattern.is_match(line)).collect();
    let start = kept.iter().position(|l| !l.trim().is_empty()).unwrap_or(kept.len());
    let end = kept.iter().rposition(|l| !l.trim().is_empty()).map_or(start, |i| i + 1);
    kept[start..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag_is_exact() {
        assert_eq!(Language::from_tag("python"), Language::Python);
        assert_eq!(Language::from_tag("Python"), Language::Unknown("Python".to_string()));
        assert_eq!(Language::from_tag("ruby").tag(), "ruby");
    }

    #[test]
    fn test_builtin_commands() {
        let table = InterpreterTable::default();
        assert_eq!(table.command_for(&Language::Perl), "perl -e");
        assert_eq!(table.command_for(&Language::Php), "php -r");
        assert_eq!(table.command_for(&Language::Python), "python3 -c");
        assert_eq!(table.command_for(&Language::Python3), "python3 -c");
        assert_eq!(table.command_for(&Language::Python2), "python2 -c");
        assert_eq!(table.command_for(&Language::Ruby), "ruby -e");
        assert_eq!(table.command_for(&Language::from_tag("haskell")), "cat");
    }

    #[test]
    fn test_overrides_win() {
        let mut overrides = BTreeMap::new();
        overrides.insert("python".to_string(), "python3.12 -c".to_string());
        overrides.insert("lua".to_string(), "lua -e".to_string());
        let table = InterpreterTable::new(overrides);
        assert_eq!(table.command_for(&Language::Python), "python3.12 -c");
        assert_eq!(table.command_for(&Language::from_tag("lua")), "lua -e");
        assert_eq!(table.command_for(&Language::Python3), "python3 -c");
    }

    #[test]
    fn test_remove_import_statements() {
        let code = "import statistics\n\nprint(statistics.mean([1,2,3]))";
        assert_eq!(remove_import_statements(code, &Language::Python), "print(statistics.mean([1,2,3]))");

        let code = "from os import path\n    import sys\nx = 1\n\ny = 2\n";
        assert_eq!(remove_import_statements(code, &Language::Python3), "x = 1\n\ny = 2");
    }

    #[test]
    fn test_remove_import_statements_keeps_lookalikes() {
        let code = "important = 1\nfromage = 2";
        assert_eq!(remove_import_statements(code, &Language::Python), code);
    }

    #[test]
    fn test_remove_import_statements_other_language_untouched() {
        let code = "import foo\nputs 1";
        assert_eq!(remove_import_statements(code, &Language::Ruby), code);
    }
}

//! Normalizes a code block's classes and attributes into a [`Directive`].
//!
//! Classes are boolean switches, keys carry values. Keys are matched exactly
//! and unknown ones are ignored so documents can carry attributes meant for
//! other filters.

use crate::ast::Attr;
use crate::language::{InterpreterTable, Language};

/// Classes with a meaning of their own; they never name the language.
const FLAG_CLASSES: &[&str] = &["exec", "interactive", "hideimports", "caption", "capbelow", "plt", "hide"];

/// How much of the `file=` path to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PathLength {
    /// Only the final path segment.
    #[default]
    FileName,
    /// The path exactly as written in the attribute.
    Full,
    /// The given number of trailing segments.
    Segments(usize),
}

impl PathLength {
    fn parse(value: &str) -> Option<Self> {
        if value == "full" {
            return Some(Self::Full);
        }
        match value.trim().parse::<usize>() {
            Ok(0) | Err(_) => None,
            Ok(n) => Some(Self::Segments(n)),
        }
    }

    /// Trims `path` to the configured number of trailing segments.
    pub fn trim(&self, path: &str) -> String {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match self {
            Self::Full => path.to_string(),
            Self::FileName => segments.last().copied().unwrap_or(path).to_string(),
            Self::Segments(n) if *n >= segments.len() => path.to_string(),
            Self::Segments(n) => segments[segments.len() - n..].join("/"),
        }
    }
}

/// Everything the renderer needs to know about one code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub language: Option<Language>,
    pub exec: bool,
    pub interactive: bool,
    pub hide_imports: bool,
    pub hide_code: bool,
    pub command: Option<String>,
    pub runas: Option<String>,
    pub file: Option<String>,
    pub lines: Option<String>,
    pub wd: Option<String>,
    pub args: Option<String>,
    /// `Some("")` when only the `.caption` class is present.
    pub caption: Option<String>,
    pub short_caption: Option<String>,
    pub caption_below: bool,
    pub label: Option<String>,
    pub plot: bool,
    /// Only set when the block gives a size; configured defaults fill the rest.
    pub plot_width: Option<String>,
    pub plot_height: Option<String>,
    pub path_length: PathLength,
}

impl Directive {
    pub fn from_attr(attr: &Attr) -> Self {
        let language = attr
            .classes()
            .iter()
            .find(|c| !FLAG_CLASSES.contains(&c.as_str()))
            .map(|c| Language::from_tag(c));

        let owned = |key: &str| attr.get(key).map(str::to_string);

        let caption = owned("caption").or_else(|| attr.has_class("caption").then(String::new));

        let mut plot_width = owned("width");
        let mut plot_height = owned("height");
        let plt = attr.get("plt");
        if let Some(dimensions) = plt {
            match dimensions.split_once(',') {
                Some((width, height)) => {
                    plot_width = Some(width.trim().to_string());
                    plot_height = Some(height.trim().to_string());
                }
                None if !dimensions.trim().is_empty() => plot_width = Some(dimensions.trim().to_string()),
                None => {}
            }
        }

        let path_length = match attr.get("pathlength").or_else(|| attr.get("pathdepth")) {
            Some(value) => PathLength::parse(value).unwrap_or_else(|| {
                log::warn!("Invalid path length '{value}', showing the file name only");
                PathLength::FileName
            }),
            None => PathLength::FileName,
        };

        Self {
            language,
            exec: attr.has_class("exec"),
            interactive: attr.has_class("interactive"),
            hide_imports: attr.has_class("hideimports"),
            hide_code: attr.has_class("hide"),
            command: owned("cmd"),
            runas: owned("runas"),
            file: owned("file"),
            lines: owned("lines"),
            wd: owned("wd"),
            args: owned("args"),
            caption,
            short_caption: owned("shortcaption"),
            caption_below: attr.has_class("capbelow"),
            label: owned("label"),
            plot: plt.is_some() || attr.has_class("plt"),
            plot_width,
            plot_height,
            path_length,
        }
    }

    /// The language that decides interpreter-specific behavior: `runas`
    /// first, then the block's language class.
    pub fn effective_language(&self) -> Language {
        match (&self.runas, &self.language) {
            (Some(key), _) => Language::from_tag(key),
            (None, Some(language)) => language.clone(),
            (None, None) => Language::Unknown(String::new()),
        }
    }

    /// `cmd` beats `runas`, which beats the language class.
    pub fn command(&self, table: &InterpreterTable) -> String {
        match &self.command {
            Some(command) => command.clone(),
            None => table.command_for(&self.effective_language()),
        }
    }

    pub fn has_caption(&self) -> bool {
        self.caption.is_some()
    }

    /// Whitespace-separated `args=` tokens.
    pub fn extra_args(&self) -> Vec<String> {
        self.args
            .as_deref()
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

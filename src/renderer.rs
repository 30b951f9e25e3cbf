//! Turns one code block into its replacement blocks.
//!
//! Per block: resolve the source (literal body or `file=`), build the
//! displayed text (interactive transcript, hidden imports, line selection),
//! run it when `.exec` is set, then wrap everything in a listing when a
//! caption was asked for. Problems with one block are rendered into the
//! document; they never abort the conversion.

use crate::ast::{Attr, Block, CodeBlock, Inline};
use crate::config::Config;
use crate::directive::Directive;
use crate::executor::{ExecutionResult, Executor};
use crate::file_resolver::FileResolver;
use crate::interactive::{InteractiveSession, has_prompts};
use crate::language::{InterpreterTable, remove_import_statements};
use crate::line_selector::filter_lines;
use crate::listing::{CaptionState, Listing, Placement, latex_caption};
use crate::plot;
use std::path::PathBuf;
use std::str::FromStr;

/// Class of the code block that replaces a block which could not be rendered.
pub const ERROR_CLASS: &str = "error";

/// Target format pandoc passes as the filter's first argument.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Latex,
    Other(String),
}

impl OutputFormat {
    pub fn is_latex(&self) -> bool {
        matches!(self, Self::Latex)
    }
}

impl FromStr for OutputFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "latex" | "beamer" => Self::Latex,
            other => Self::Other(other.to_string()),
        })
    }
}

/// State shared by all blocks of one conversion.
pub struct RenderContext {
    config: Config,
    format: OutputFormat,
    interpreters: InterpreterTable,
    resolver: FileResolver,
    executor: Executor,
    captions: CaptionState,
    plots: usize,
    caption_found: bool,
}

impl RenderContext {
    pub fn new(config: Config, format: OutputFormat) -> Self {
        Self {
            interpreters: InterpreterTable::new(config.interpreters.clone()),
            resolver: FileResolver::new(config.search_root()),
            executor: Executor::new(config.timeout),
            captions: CaptionState::new(),
            plots: 0,
            caption_found: false,
            config,
            format,
        }
    }

    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    pub fn captions(&self) -> &CaptionState {
        &self.captions
    }

    /// Whether any block produced a listing.
    pub fn caption_found(&self) -> bool {
        self.caption_found
    }

    /// Renders `block` into the blocks that replace it.
    pub fn render(&mut self, block: CodeBlock) -> Vec<Block> {
        let CodeBlock { attr, text } = block;
        let directive = Directive::from_attr(&attr);
        let language = directive.effective_language();

        let mut source = text;
        let mut display_path = None;
        if let Some(pattern) = &directive.file {
            match self.resolver.resolve(pattern) {
                Ok(resolved) => {
                    source = resolved.contents;
                    display_path = Some(directive.path_length.trim(pattern));
                }
                Err(e) => {
                    log::warn!("{e}");
                    let inner = vec![error_block(&e.to_string())];
                    let shown = directive.path_length.trim(pattern);
                    return self.wrap(&directive, &attr, inner, Some(shown));
                }
            }
        }

        let working_dir = directive.wd.as_ref().map(PathBuf::from);
        let command = directive.command(&self.interpreters);
        let interactive = directive.exec && (directive.interactive || has_prompts(&source));

        let mut output = Vec::new();
        let display = if interactive && language.is_python() {
            InteractiveSession::new(&self.executor, &command, working_dir.clone()).run(&source)
        } else {
            if interactive {
                log::warn!(
                    "Interactive sessions need a Python interpreter, running '{}' block as a script",
                    language.tag()
                );
            }
            if directive.exec {
                output = self.execute(&directive, &command, &source, working_dir);
            }
            if directive.hide_imports {
                remove_import_statements(&source, &language)
            } else {
                source
            }
        };

        let selection = directive.lines.as_deref().map(|spec| filter_lines(&display, spec));
        let code = match selection {
            None => Block::CodeBlock(attr.clone(), display),
            Some(Ok(selected)) => Block::CodeBlock(attr.clone(), selected),
            Some(Err(e)) => {
                log::warn!("{e}");
                error_block(&e.to_string())
            }
        };

        let mut inner = Vec::new();
        if !directive.hide_code {
            inner.push(code);
        }
        inner.extend(output);
        self.wrap(&directive, &attr, inner, display_path)
    }

    /// Runs the full source and returns the blocks showing its result.
    fn execute(
        &mut self,
        directive: &Directive,
        command: &str,
        source: &str,
        working_dir: Option<PathBuf>,
    ) -> Vec<Block> {
        let args = directive.extra_args();
        let language = directive.effective_language();

        if directive.plot {
            if language.is_python() {
                return self.execute_plot(directive, command, source, working_dir);
            }
            log::warn!("Plot capture needs Python, ignoring plt on a '{}' block", language.tag());
        }

        let result = self.executor.run_command(command, source, &args, working_dir);
        self.output_blocks(&result)
    }

    fn execute_plot(
        &mut self,
        directive: &Directive,
        command: &str,
        source: &str,
        working_dir: Option<PathBuf>,
    ) -> Vec<Block> {
        self.plots += 1;
        let extension = self
            .config
            .plot
            .format
            .clone()
            .unwrap_or_else(|| (if self.format.is_latex() { "pdf" } else { "png" }).to_string());
        let dir = self.config.plot.dir.clone();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            let message = format!("Failed to create plot directory {}: {e}", dir.display());
            log::warn!("{message}");
            return vec![error_block(&message)];
        }
        let image = plot::image_path(&dir, self.plots, &extension);
        // The interpreter may run elsewhere; hand it a path it can still reach.
        let target = std::path::absolute(&image).unwrap_or_else(|_| image.clone());

        let wrapped = plot::wrap_source(source, &target);
        let result = self.executor.run_command(command, &wrapped, &directive.extra_args(), working_dir);
        if !result.success() {
            return self.output_blocks(&result);
        }

        let (width, height) = self.plot_size(directive);
        vec![plot::image_block(&image, &width, &height)]
    }

    /// Block-level dimensions win over configured defaults.
    fn plot_size(&self, directive: &Directive) -> (String, String) {
        let plot = &self.config.plot;
        (
            directive.plot_width.clone().unwrap_or_else(|| plot.width.clone()),
            directive.plot_height.clone().unwrap_or_else(|| plot.height.clone()),
        )
    }

    fn output_blocks(&self, result: &ExecutionResult) -> Vec<Block> {
        let text = result.output.trim_end_matches(['\n', '\r']).to_string();
        vec![
            Block::Para(vec![Inline::Emph(vec![Inline::Str("Output:".to_string())])]),
            Block::CodeBlock(Attr::with_class(self.config.output_class.clone()), text),
        ]
    }

    /// Adds the file prefix or the listing around `inner`.
    fn wrap(
        &mut self,
        directive: &Directive,
        attr: &Attr,
        mut inner: Vec<Block>,
        display_path: Option<String>,
    ) -> Vec<Block> {
        let Some(caption) = &directive.caption else {
            if let Some(path) = display_path {
                inner.insert(0, file_prefix(&path));
            }
            return inner;
        };

        self.caption_found = true;
        let number = (!caption.is_empty()).then(|| self.captions.next_number());

        let explicit_label = directive
            .label
            .clone()
            .or_else(|| (!attr.identifier().is_empty()).then(|| attr.identifier().to_string()));
        let label = match number {
            Some(n) => Some(explicit_label.unwrap_or_else(|| format!("{}{n}", self.config.label_prefix))),
            None => explicit_label,
        };

        let (latex, plain) = match (caption.is_empty(), &display_path) {
            (false, Some(path)) => (
                format!("{}~({})", latex_caption(caption), latex_caption(&format!("`{path}`"))),
                format!("{caption} ({path})"),
            ),
            (false, None) => (latex_caption(caption), caption.clone()),
            (true, Some(path)) => (latex_caption(&format!("`{path}`")), path.clone()),
            (true, None) => (String::new(), String::new()),
        };
        let short_caption = directive
            .short_caption
            .as_deref()
            .map(latex_caption)
            .unwrap_or_else(|| latex_caption(caption));

        let listing = Listing {
            number,
            label,
            caption: latex,
            short_caption,
            plain_caption: plain,
            placement: if directive.caption_below {
                Placement::Below
            } else {
                Placement::Above
            },
        };
        if self.format.is_latex() {
            listing.wrap_latex(inner)
        } else {
            listing.wrap_generic(inner)
        }
    }
}

/// `*File:* `path``
fn file_prefix(path: &str) -> Block {
    Block::Para(vec![
        Inline::Emph(vec![Inline::Str("File:".to_string())]),
        Inline::Space,
        Inline::Code(Attr::default(), path.to_string()),
    ])
}

fn error_block(message: &str) -> Block {
    Block::CodeBlock(Attr::with_class(ERROR_CLASS), message.to_string())
}

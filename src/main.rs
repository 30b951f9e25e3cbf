use anyhow::Context;
use clap::Parser;
use colored::*;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process;

use pandoc_source_exec::config::{CONFIG_ENV, Config};
use pandoc_source_exec::{OutputFormat, run_filter};

/// The document was filtered and written.
const SUCCESS: i32 = 0;

/// Unreadable input, invalid configuration or a write failure. Pandoc aborts
/// the conversion; problems confined to one code block never get here.
const TOOL_ERROR: i32 = 2;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format pandoc is producing (passed by pandoc itself)
    #[arg(required = false)]
    format: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let env = env_logger::Env::new().filter_or("PANDOC_SOURCE_EXEC_LOG", if verbose { "debug" } else { "warn" });
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let format = match cli.format.as_deref() {
        Some(name) => name.parse::<OutputFormat>()?,
        None => OutputFormat::default(),
    };
    log::debug!("Filtering for {format:?} with {config:?}");

    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    run_filter(stdin, stdout, config, format).context("Failed to filter the document")
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => process::exit(SUCCESS),
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            process::exit(TOOL_ERROR);
        }
    }
}

//! The `dut-cases` command-line interface.
//!
//! Parses arguments, loads configuration, runs the collection driver and
//! hands the result to [`output`].

use std::{path::PathBuf, process};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::{
    collect::{CaseCollector, PytestCollector, SelectorArg},
    config::Config,
    errors::print_error,
    select::CollectMode,
};

pub mod output;

// ============================================================================
// CLI ARGUMENTS - Command-line argument definitions
// ============================================================================

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "dut-cases",
    version,
    about = "Resolve pytest target marks and multi-DUT parametrizations into CI cases."
)]
pub struct CasesArgs {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// YAML file with the known targets and the test file prefix.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ArgsCommand,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum ArgsCommand {
    /// Collect the cases to run from test files or directories.
    Collect {
        /// Test files or directories to scan.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Comma-separated targets the cases must need exactly, e.g. "esp32s3,esp32s2".
        #[arg(short, long, conflicts_with = "mode")]
        target: Option<String>,

        /// Collection mode used when no --target is given [default: all].
        #[arg(short, long, value_enum)]
        mode: Option<CollectMode>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the mark names treated as targets.
    Targets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = CasesArgs::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => Config::load(path).unwrap_or_else(|e| {
            print_error(e);
            process::exit(1);
        }),
        None => Config::default(),
    };

    match args.command {
        ArgsCommand::Collect {
            paths,
            target,
            mode,
            format,
        } => {
            let selector = match target {
                Some(raw) => SelectorArg::Raw(raw),
                None => SelectorArg::Mode(mode.unwrap_or(CollectMode::All)),
            };
            let collector = CaseCollector::new(PytestCollector::new(config));
            let cases = collector.collect(&paths, selector).unwrap_or_else(|e| {
                print_error(e);
                process::exit(1);
            });

            let written = match format {
                OutputFormat::Text => output::print_cases(&cases),
                OutputFormat::Json => output::print_json(&cases),
            };
            if let Err(e) = written {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }

        ArgsCommand::Targets => {
            output::print_targets(&config.targets);
        }
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

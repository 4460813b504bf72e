//! Strobe CLI — runs the SPI flash conformance scenarios from the command line.
//!
//! Provides `strobe run` for driving the reference controller through the
//! scenario catalog and `strobe list` for printing the catalog.

#![warn(missing_docs)]

mod list;
mod run;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Strobe — cycle-accurate SPI flash controller verification.
#[derive(Parser, Debug)]
#[command(name = "strobe", version, about = "Strobe verification harness")]
pub struct Cli {
    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Raise log verbosity (repeat for more detail).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to a `strobe.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run conformance scenarios against the reference controller.
    Run(RunArgs),
    /// List the scenario catalog.
    List,
}

/// Arguments for the `strobe run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario id or number to run on its own.
    pub name: Option<String>,

    /// Substring filter on scenario ids and titles.
    #[arg(long)]
    pub filter: Option<String>,

    /// Disable waveform recording.
    #[arg(long)]
    pub no_waveform: bool,

    /// Output path for the waveform file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Result output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON report.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

/// Default log directive for the given flags.
fn log_level(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Full filter directive. Findings printed on stdout are not logged again.
fn log_directive(quiet: bool, verbose: u8, prints_findings: bool) -> String {
    let level = log_level(quiet, verbose);
    if prints_findings {
        format!("{level},strobe_sim::oracle=off")
    } else {
        level.to_string()
    }
}

/// Whether `command` renders every finding on stdout itself.
fn prints_findings(command: &Command, quiet: bool) -> bool {
    !quiet && matches!(command, Command::Run(args) if args.format == ReportFormat::Text)
}

fn init_logging(directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let prints = prints_findings(&cli.command, cli.quiet);
    init_logging(&log_directive(cli.quiet, cli.verbose, prints));

    let global = GlobalArgs {
        quiet: cli.quiet,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::List => list::run(),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

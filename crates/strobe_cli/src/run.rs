//! `strobe run` — drive the reference controller through the scenarios.
//!
//! Loads `strobe.toml`, builds and resets the reference device, runs the
//! selected scenarios in catalog order and reports every finding plus a
//! summary line. Returns exit code 0 if nothing failed, 1 otherwise.

use std::path::PathBuf;

use strobe_config::{StrobeConfig, CONFIG_FILE_NAME};
use strobe_conformance::{catalog, find, reference_harness, run_suite, select, Scenario};
use strobe_sim::{Report, TraceSink};
use tracing::info;

use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Runs the `strobe run` command.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config_path = global
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let config = strobe_config::load_config(&config_path)?;

    let scenarios = select_scenarios(args.name.as_deref(), args.filter.as_deref())?;
    if scenarios.is_empty() {
        if !global.quiet {
            eprintln!("warning: no scenarios match the given filter");
        }
        return Ok(0);
    }

    let trace = match trace_path(args, &config) {
        Some(path) => {
            info!(path = %path.display(), "recording waveform");
            TraceSink::create(&path)?
        }
        None => TraceSink::disabled(),
    };

    let text = args.format == ReportFormat::Text;
    if text && !global.quiet {
        println!("\n=== SPI Flash Controller Conformance ===\n");
    }

    let mut harness = reference_harness(&config, trace);
    for scenario in scenarios {
        let first = harness.findings().len();
        run_suite(&mut harness, std::iter::once(scenario));
        if text && !global.quiet {
            println!("[TEST {}] {}", scenario.number, scenario.title);
            for finding in &harness.findings()[first..] {
                println!("  {finding}");
            }
        }
    }

    let report = harness.finish()?;
    match args.format {
        ReportFormat::Text => print_summary(&report),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(report.exit_code())
}

/// Resolves the scenario list: an exact name wins over the filter.
fn select_scenarios(
    name: Option<&str>,
    filter: Option<&str>,
) -> Result<Vec<&'static Scenario>, String> {
    match (name, filter) {
        (Some(name), _) => find(name)
            .map(|s| vec![s])
            .ok_or_else(|| format!("unknown scenario '{name}'")),
        (None, Some(filter)) => Ok(select(filter)),
        (None, None) => Ok(catalog().iter().collect()),
    }
}

/// Where the waveform goes, if anywhere.
fn trace_path(args: &RunArgs, config: &StrobeConfig) -> Option<PathBuf> {
    if args.no_waveform {
        return None;
    }
    match &args.output {
        Some(path) => Some(path.clone()),
        None if config.trace.enabled => Some(config.trace.path.clone()),
        None => None,
    }
}

fn print_summary(report: &Report) {
    println!("\n=== Results: {} ===", report.tally);
    println!("   finished at {} after {} samples", report.final_time, report.samples);
}

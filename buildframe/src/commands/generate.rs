//! Generate command - runs the derivation pipeline and prints the report.

use crate::cli::{Cli, GenerateArgs, ReportFormat};
use crate::commands::load_config;
use buildframe_core::{GenerationReport, Result};
use std::process::ExitCode;
use tracing::info;

pub fn run(cli: &Cli, args: GenerateArgs) -> Result<ExitCode> {
    let config = load_config(cli)?;

    info!("running builder generation");
    let report = buildframe_core::generate(config)?;

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Pretty => print_report(&report),
    }

    // Exit policy: any fatal per-item diagnostic makes the run fail, even
    // though other items completed.
    Ok(if report.has_fatal() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_report(report: &GenerationReport) {
    println!(
        "buildframe: {} written, {} unchanged, {} removed, {} skipped, {} failed",
        report.written, report.unchanged, report.removed, report.skipped, report.failed
    );
    for diagnostic in &report.diagnostics {
        eprintln!("{}", diagnostic);
    }
    if report.is_noop() && report.diagnostics.is_empty() {
        println!("everything up to date");
    }
}

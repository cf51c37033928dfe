//! Command-line interface definitions for Buildframe.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Buildframe - fluent builder derivation for annotated Rust types
#[derive(Parser, Debug)]
#[command(name = "buildframe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to buildframe.toml configuration file
    #[arg(short, long, global = true, env = "BUILDFRAME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive builder files from annotated declarations (default)
    Generate(GenerateArgs),

    /// Remove every generated builder file under the configured roots
    Clean(CleanArgs),

    /// Initialize a new buildframe.toml configuration file
    Init(InitArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Report output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub format: ReportFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Pretty,
    /// JSON report on stdout
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// List the files that would be removed without deleting them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Overwrite existing buildframe.toml if present
    #[arg(short, long)]
    pub force: bool,
}

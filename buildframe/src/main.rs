mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, GenerateArgs};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins when set; otherwise verbosity flags pick the level.
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match &cli.command {
        Some(Commands::Generate(args)) => commands::generate::run(&cli, args.clone()),
        Some(Commands::Clean(args)) => commands::clean::run(&cli, args.clone()),
        Some(Commands::Init(args)) => commands::init::run(args.clone()),
        None => commands::generate::run(&cli, GenerateArgs::default()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

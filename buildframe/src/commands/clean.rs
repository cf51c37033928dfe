//! Clean command - bulk removal of generated builder files.
//!
//! This is the housekeeping collaborator that lives outside the pipeline:
//! the pipeline's own stale-file removal is scoped to single orphaned
//! files, while `clean` wipes every marker-owned file so the next run is a
//! cold start. Only files carrying the generated marker are ever touched.

use crate::cli::{Cli, CleanArgs};
use crate::commands::load_config;
use buildframe_core::Result;
use buildframe_core::output::collect_generated_files;
use std::fs;
use std::process::ExitCode;
use tracing::{debug, warn};

pub fn run(cli: &Cli, args: CleanArgs) -> Result<ExitCode> {
    let config = load_config(cli)?;

    let generated = collect_generated_files(&config)?;
    if generated.is_empty() {
        println!("nothing to clean");
        return Ok(ExitCode::SUCCESS);
    }

    let mut removed = 0usize;
    let mut parents = Vec::new();
    for path in &generated {
        if args.dry_run {
            println!("would remove {}", path.display());
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(file = %path.display(), "removed");
                println!("cleaned: {}", path.display());
                removed += 1;
                if let Some(parent) = path.parent() {
                    parents.push(parent.to_path_buf());
                }
            }
            Err(e) => warn!(file = %path.display(), "could not remove: {}", e),
        }
    }

    // Prune directories the wipe emptied; non-empty ones refuse removal and
    // that is fine.
    parents.sort();
    parents.dedup();
    for parent in parents {
        let _ = fs::remove_dir(parent);
    }

    if args.dry_run {
        println!("{} files would be removed", generated.len());
    } else {
        println!("clean completed, {} files removed", removed);
    }
    Ok(ExitCode::SUCCESS)
}

//! Init command - writes a starter buildframe.toml.

use crate::cli::InitArgs;
use buildframe_core::{BuildframeError, Result};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

const TEMPLATE: &str = r#"# Buildframe configuration
# See https://github.com/buildframe/buildframe for the full reference.

[scan]
# Directories scanned for #[derive(Buildable)] declarations.
roots = ["src"]
# Glob patterns excluded from scanning.
ignore = ["**/target/**"]
# Extra derive names accepted as the derivation marker.
# marker_aliases = ["Assemble"]

[output]
# "alongside" writes builders into a generated directory next to each
# declaring file; "flat" collects them all under output.path.
mode = "alongside"
dir_name = "generated"
# mode = "flat"
# path = "src/generated"
"#;

pub fn run(args: InitArgs) -> Result<ExitCode> {
    let path = Path::new("buildframe.toml");
    if path.exists() && !args.force {
        return Err(BuildframeError::config(
            "buildframe.toml already exists (use --force to overwrite)",
        ));
    }

    fs::write(path, TEMPLATE)?;
    info!("wrote starter configuration");
    println!("created buildframe.toml");
    Ok(ExitCode::SUCCESS)
}

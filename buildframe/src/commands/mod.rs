//! Command handlers for the Buildframe CLI.

pub mod clean;
pub mod generate;
pub mod init;

use crate::cli::Cli;
use buildframe_core::{BuildConfig, BuildframeError, Result};
use tracing::{info, warn};

/// Resolves the configuration for a run: an explicit `--config` path wins,
/// otherwise buildframe.toml is searched upward from the working directory,
/// falling back to defaults when none exists.
pub fn load_config(cli: &Cli) -> Result<BuildConfig> {
    if let Some(path) = &cli.config {
        info!(config = %path.display(), "loading configuration");
        return BuildConfig::from_toml_path(path);
    }
    match BuildConfig::from_toml() {
        Ok(config) => Ok(config),
        Err(BuildframeError::ConfigNotFound { .. }) => {
            warn!("no buildframe.toml found, using default configuration");
            Ok(BuildConfig::default())
        }
        Err(e) => Err(e),
    }
}

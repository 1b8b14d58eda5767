//! Command handlers -- one module per subcommand

pub mod config;
pub mod scan;

use std::path::{Path, PathBuf};

use tracing::debug;

use repowatch_core::config::RepowatchConfig;
use repowatch_core::error::RepowatchError;

use crate::cli::DEFAULT_CONFIG_FILE;
use crate::error::CliError;
use crate::logging::with_bootstrap_logging;

/// Resolve the configuration path. An explicit path must exist; the default
/// path is optional.
pub fn config_source(explicit: Option<&Path>) -> (PathBuf, bool) {
    match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    }
}

/// Load file + env overrides + defaults. Every failure maps to a
/// configuration error (exit code 2).
///
/// The result is not validated: callers apply their flags first and then
/// call `validate()` once.
pub async fn load_config(explicit: Option<&Path>) -> Result<RepowatchConfig, CliError> {
    let (path, required) = config_source(explicit);
    debug!(path = %path.display(), required, "loading configuration");

    let loaded = if required {
        RepowatchConfig::from_file(&path).await
    } else {
        RepowatchConfig::from_file_or_default(&path).await
    };
    let mut config = loaded.map_err(|e| CliError::Config(e.to_string()))?;
    with_bootstrap_logging(|| config.apply_env_overrides());
    Ok(config)
}

/// Map a core error raised while loading or validating configuration.
pub fn config_error(e: RepowatchError) -> CliError {
    match e {
        RepowatchError::Config(_) => CliError::Config(e.to_string()),
        other => CliError::Core(other),
    }
}

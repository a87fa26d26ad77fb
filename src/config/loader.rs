// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::RawConfig;
use crate::errors::{DevRunnerError, Result};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "devrunner.toml";

/// Raw configuration plus the file it came from, if any.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: RawConfig,
    pub path: Option<PathBuf>,
}

/// Load a configuration file from a given path and return the raw
/// `RawConfig`.
///
/// This only performs TOML deserialization; defaults are applied by
/// [`crate::config::resolve_config`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Locate and load the configuration file.
///
/// - An explicit path must exist; a missing file is a configuration error.
/// - Without an explicit path, [`DEFAULT_CONFIG_FILE`] in `cwd` is used if it
///   exists; otherwise an empty configuration is returned.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<LoadedConfig> {
    let Some(path) = resolve_config_path(explicit, cwd)? else {
        return Ok(LoadedConfig::default());
    };

    let config = load_from_path(&path)?;
    Ok(LoadedConfig {
        config,
        path: Some(path),
    })
}

fn resolve_config_path(explicit: Option<&Path>, cwd: &Path) -> Result<Option<PathBuf>> {
    if let Some(explicit) = explicit {
        let absolute = cwd.join(explicit);
        if !absolute.exists() {
            return Err(DevRunnerError::ConfigError(format!(
                "config file not found at {}",
                absolute.display()
            )));
        }
        return Ok(Some(absolute));
    }

    let default_path = cwd.join(DEFAULT_CONFIG_FILE);
    Ok(default_path.exists().then_some(default_path))
}

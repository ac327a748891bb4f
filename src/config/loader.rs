// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{HarnessConfig, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// A missing file at the *default* location is not an error: the harness then
/// runs with the built-in reference deployment. An explicitly requested file
/// that is missing is reported as an IO error.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<HarnessConfig> {
    let path = path.as_ref();

    let raw = if !path.exists() && path == default_config_path() {
        info!(
            path = %path.display(),
            "no config file found; using built-in defaults"
        );
        RawConfigFile::default()
    } else {
        load_from_path(path)?
    };

    HarnessConfig::try_from(raw)
}

/// Default config location: `Clusterherd.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Clusterherd.toml")
}

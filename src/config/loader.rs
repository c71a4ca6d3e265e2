// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a config file without checking its values.
///
/// Missing sections and keys are filled from defaults; unknown keys are an
/// error. See [`load_and_validate`] for the checked variant.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = contents.len(), "read config file");
    let raw: RawConfigFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Parse and validate configuration held in a string.
pub fn load_from_str(contents: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw)
}

/// Read, deserialize and validate a config file.
///
/// Runtime limits of zero are rejected with `ConfigError`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw = load_from_path(path)?;
    ConfigFile::try_from(raw)
}

/// `Tagflow.toml` in the current directory, unless `TAGFLOW_CONFIG` points
/// elsewhere.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("TAGFLOW_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Tagflow.toml"))
}

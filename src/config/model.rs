// src/config/model.rs

use serde::Deserialize;

use crate::types::LogLevel;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [runtime]
/// max_concurrency = 4
/// event_channel_capacity = 64
///
/// [logging]
/// level = "debug"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runtime: RuntimeSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runtime: RuntimeSection,
    pub logging: LoggingSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(runtime: RuntimeSection, logging: LoggingSection) -> Self {
        Self { runtime, logging }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.runtime, raw.logging)
    }
}

/// `[runtime]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Maximum number of work units running concurrently (>= 1).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Capacity of the runtime event channel (>= 1).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_max_concurrency() -> usize {
    4
}

fn default_event_channel_capacity() -> usize {
    64
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// If `None`, `TAGFLOW_LOG` or `info` is used.
    #[serde(default)]
    pub level: Option<LogLevel>,
}

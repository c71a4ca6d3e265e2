// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TagflowError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TagflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.runtime, raw.logging))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runtime.max_concurrency == 0 {
        return Err(TagflowError::ConfigError(
            "[runtime].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.runtime.event_channel_capacity == 0 {
        return Err(TagflowError::ConfigError(
            "[runtime].event_channel_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

#![allow(dead_code)]

use tagflow::config::{ConfigFile, RawConfigFile};
use tagflow::errors::Result;
use tagflow::item::TaggedItem;
use tagflow::types::LogLevel;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.runtime.max_concurrency = n;
        self
    }

    pub fn event_channel_capacity(mut self, n: usize) -> Self {
        self.config.runtime.event_channel_capacity = n;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = Some(level);
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build().expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Item carrying a single `SeriesDescription` tag.
pub fn series_item(name: &str, series: &str) -> TaggedItem {
    TaggedItem::new(name)
        .with_filename(format!("{name}.dcm"))
        .with_tag("SeriesDescription", series)
}

/// Four items: three in series "axial", one in series "sagittal".
pub fn two_series_items() -> Vec<TaggedItem> {
    vec![
        series_item("img1", "axial"),
        series_item("img2", "axial"),
        series_item("img3", "axial"),
        series_item("img4", "sagittal"),
    ]
}

/// `count` items, each alone in its own series `series-00000`, `series-00001`, ...
pub fn many_series_items(count: usize) -> Vec<TaggedItem> {
    (0..count)
        .map(|n| series_item(&format!("img{n}"), &format!("series-{n:05}")))
        .collect()
}

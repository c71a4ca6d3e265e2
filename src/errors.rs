// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::dag::NodeId;

#[derive(Error, Debug)]
pub enum TagflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Cycle detected in pipeline: {0}")]
    DagCycle(String),

    #[error("Invalid pipeline graph: {0}")]
    InvalidGraph(String),

    #[error("Unsupported grouping: {0}")]
    UnsupportedGrouping(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TagflowError>;

// src/config/mod.rs

//! Configuration loading and validation for tagflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//!
//! Pipeline topology is not part of the configuration; graphs are built in
//! code through [`crate::dag::Pipeline`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{ConfigFile, LoggingSection, RawConfigFile, RuntimeSection};

// src/engine/mod.rs

//! Parallel execution engine for tagflow.
//!
//! This module ties together:
//! - the pipeline scheduler
//! - an executor backend running work units concurrently
//! - the main runtime event loop that reacts to:
//!   - job completion events
//!   - shutdown requests
//!
//! Every completion flows through one channel consumed by one loop, so the
//! scheduler only ever sees one event at a time. The pure core state machine
//! lives in [`core`]; the async/IO shell is implemented in [`runtime`].

use crate::config::ConfigFile;
use crate::exec::JobOutcome;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Maximum number of work units running at the same time.
    pub max_concurrency: usize,
    /// Capacity of the runtime event channel.
    pub event_channel_capacity: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            event_channel_capacity: 64,
        }
    }
}

impl From<&ConfigFile> for RuntimeOptions {
    fn from(cfg: &ConfigFile) -> Self {
        Self {
            max_concurrency: cfg.runtime.max_concurrency,
            event_channel_capacity: cfg.runtime.event_channel_capacity,
        }
    }
}

/// Events flowing into the runtime from executors and embedders.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A dispatched job finished, successfully or not.
    JobCompleted(JobOutcome),
    /// Stop the event loop without waiting for in-flight jobs.
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;

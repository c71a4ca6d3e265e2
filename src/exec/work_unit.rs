// src/exec/work_unit.rs

//! The external computation an executor node delegates to.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use crate::filter::Filter;
use crate::item::TaggedItem;

/// Error raised by a work unit. Becomes a `Failed` status for the key that
/// was running, never a scheduler error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct WorkUnitError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl WorkUnitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Opaque unit of work run by an executor node.
///
/// `run` may block for an arbitrary amount of time; the async runtime calls
/// it from a blocking thread.
pub trait WorkUnit: Send + Sync {
    fn name(&self) -> &str;

    /// Constraints every consumed item must satisfy.
    ///
    /// Read on every scheduling decision, so implementations may change them
    /// between runs.
    fn mandatory_consumes(&self) -> Vec<Filter> {
        Vec::new()
    }

    fn run(&self, items: Vec<TaggedItem>) -> Result<Vec<TaggedItem>, WorkUnitError>;
}

type WorkFn = dyn Fn(Vec<TaggedItem>) -> Result<Vec<TaggedItem>, WorkUnitError> + Send + Sync;

/// Work unit backed by a closure, with reconfigurable constraints.
pub struct FnWorkUnit {
    name: String,
    consumes: RwLock<Vec<Filter>>,
    func: Box<WorkFn>,
}

impl FnWorkUnit {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Vec<TaggedItem>) -> Result<Vec<TaggedItem>, WorkUnitError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            consumes: RwLock::new(Vec::new()),
            func: Box::new(func),
        }
    }

    pub fn with_mandatory_consumes(self, filters: Vec<Filter>) -> Self {
        self.set_mandatory_consumes(filters);
        self
    }

    pub fn set_mandatory_consumes(&self, filters: Vec<Filter>) {
        *self.consumes.write().unwrap_or_else(PoisonError::into_inner) = filters;
    }
}

impl fmt::Debug for FnWorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnWorkUnit")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl WorkUnit for FnWorkUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn mandatory_consumes(&self) -> Vec<Filter> {
        self.consumes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn run(&self, items: Vec<TaggedItem>) -> Result<Vec<TaggedItem>, WorkUnitError> {
        (self.func)(items)
    }
}

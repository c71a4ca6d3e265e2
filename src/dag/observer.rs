// src/dag/observer.rs

//! Status observers: sinks for `(node, key, status)` transitions.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::dag::key::ExecutionKey;
use crate::dag::node::NodeId;
use crate::dag::status::OperatorStatus;

/// One status transition of one node for one execution key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub node: NodeId,
    pub node_name: String,
    pub key: ExecutionKey,
    pub status: OperatorStatus,
    /// Error message, only set for `Failed` transitions.
    pub error: Option<String>,
}

pub trait StatusObserver: Send + Sync {
    fn on_status(&self, event: &StatusEvent);
}

/// Logs every transition through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StatusObserver for TracingObserver {
    fn on_status(&self, event: &StatusEvent) {
        match event.status {
            OperatorStatus::Failed => warn!(
                node = %event.node_name,
                key = %event.key,
                error = event.error.as_deref().unwrap_or("unknown error"),
                "operator failed"
            ),
            OperatorStatus::Running => info!(
                node = %event.node_name,
                key = %event.key,
                "operator started"
            ),
            status => debug!(
                node = %event.node_name,
                key = %event.key,
                ?status,
                "operator status changed"
            ),
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct StatusLog {
    events: Mutex<Vec<StatusEvent>>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded transitions of `node` into `status`.
    pub fn count(&self, node: NodeId, status: OperatorStatus) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.node == node && e.status == status)
            .count()
    }
}

impl StatusObserver for StatusLog {
    fn on_status(&self, event: &StatusEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

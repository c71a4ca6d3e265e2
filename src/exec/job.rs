// src/exec/job.rs

//! A single work-unit invocation and its outcome.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dag::{ExecutionKey, NodeId};
use crate::exec::work_unit::{WorkUnit, WorkUnitError};
use crate::item::TaggedItem;

/// Description of a work unit the scheduler wants run now.
#[derive(Clone)]
pub struct ScheduledJob {
    pub node: NodeId,
    pub node_name: String,
    pub key: ExecutionKey,
    /// Inputs after the node's input filters were applied.
    pub inputs: Vec<TaggedItem>,
    pub work: Arc<dyn WorkUnit>,
}

impl fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("node", &self.node)
            .field("node_name", &self.node_name)
            .field("key", &self.key)
            .field("inputs", &self.inputs.len())
            .field("work", &self.work.name())
            .finish()
    }
}

impl ScheduledJob {
    /// Run the work unit on the calling thread.
    ///
    /// A panic inside the work unit is reported as a failure of this job.
    pub fn run(self) -> JobOutcome {
        debug!(
            node = %self.node_name,
            key = %self.key,
            work = self.work.name(),
            inputs = self.inputs.len(),
            "running work unit"
        );

        let work = Arc::clone(&self.work);
        let inputs = self.inputs;
        let result = match catch_unwind(AssertUnwindSafe(|| work.run(inputs))) {
            Ok(result) => result,
            Err(_) => {
                warn!(node = %self.node_name, key = %self.key, "work unit panicked");
                Err(WorkUnitError::new(format!(
                    "work unit '{}' panicked",
                    work.name()
                )))
            }
        };

        JobOutcome {
            node: self.node,
            key: self.key,
            result,
        }
    }
}

/// Result of running a [`ScheduledJob`], fed back into the scheduler.
#[derive(Debug)]
pub struct JobOutcome {
    pub node: NodeId,
    pub key: ExecutionKey,
    pub result: Result<Vec<TaggedItem>, WorkUnitError>,
}

impl JobOutcome {
    pub fn failed(node: NodeId, key: ExecutionKey, error: WorkUnitError) -> Self {
        Self {
            node,
            key,
            result: Err(error),
        }
    }
}

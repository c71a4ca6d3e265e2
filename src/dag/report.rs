// src/dag/report.rs

//! Step-by-step and whole-run result types for the pipeline scheduler.

use crate::dag::node::NodeId;
use crate::dag::status::OperatorStatus;
use crate::exec::ScheduledJob;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the pipeline and
/// make assertions about what changed.
#[derive(Debug, Clone)]
pub struct SchedulerStep {
    /// Jobs that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledJob>,
    /// Nodes that entered `Failed` or `Unexecutable` during this step.
    pub newly_failed: Vec<NodeId>,
    /// Whether this step finished the pipeline.
    pub run_just_finished: bool,
}

/// Status snapshot of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub id: NodeId,
    pub name: String,
    pub kind: &'static str,
    pub status: OperatorStatus,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// `Failed` if any node failed, `Completed` otherwise.
    pub status: OperatorStatus,
    /// Whether every top-level node reached a terminal status.
    pub done: bool,
    /// Every non-link node, in id order.
    pub nodes: Vec<NodeReport>,
}

impl PipelineReport {
    pub fn node(&self, id: NodeId) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn count(&self, status: OperatorStatus) -> usize {
        self.nodes.iter().filter(|n| n.status == status).count()
    }
}

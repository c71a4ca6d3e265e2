// src/dag/state_manager.rs

//! Readiness scans and failure propagation over a [`DagGraph`].

use std::collections::HashSet;

use tracing::debug;

use crate::dag::DagGraph;
use crate::dag::key::ExecutionKey;
use crate::dag::node::NodeId;
use crate::dag::status::OperatorStatus;

/// Read-only scans used to decide what can start next.
pub struct ReadinessScanner<'a> {
    graph: &'a DagGraph,
}

impl<'a> ReadinessScanner<'a> {
    pub fn new(graph: &'a DagGraph) -> Self {
        Self { graph }
    }

    /// Top-level nodes with no incoming link: the initial frontier.
    pub fn operators_without_previous(&self) -> Vec<NodeId> {
        self.graph
            .nodes()
            .filter(|n| !n.is_link() && n.owner.is_none())
            .filter(|n| self.graph.upstream_of(n.id).is_empty())
            .map(|n| n.id)
            .collect()
    }

    /// Top-level nodes that are `Pending` and whose upstream nodes have all
    /// `Completed`.
    pub fn operators_ready(&self) -> Vec<NodeId> {
        self.graph
            .nodes()
            .filter(|n| !n.is_link() && n.owner.is_none())
            .filter(|n| n.status() == OperatorStatus::Pending)
            .filter(|n| {
                self.graph.upstream_of(n.id).iter().all(|up| {
                    self.graph
                        .node(*up)
                        .map(|u| u.status() == OperatorStatus::Completed)
                        .unwrap_or(false)
                })
            })
            .map(|n| n.id)
            .collect()
    }

    /// Children of `iterator` that are `Pending` under `child_key` and whose
    /// upstream siblings have all `Completed` under the same key.
    pub fn group_ready(&self, iterator: NodeId, child_key: &ExecutionKey) -> Vec<NodeId> {
        let Some(node) = self.graph.node(iterator) else {
            return Vec::new();
        };
        node.children()
            .iter()
            .copied()
            .filter(|child| {
                self.graph
                    .node(*child)
                    .map(|c| c.status_of(child_key) == OperatorStatus::Pending)
                    .unwrap_or(false)
            })
            .filter(|child| {
                self.graph.upstream_of(*child).iter().all(|up| {
                    self.graph
                        .node(*up)
                        .map(|u| u.status_of(child_key) == OperatorStatus::Completed)
                        .unwrap_or(false)
                })
            })
            .collect()
    }
}

/// Mark every node reachable downstream of `failed` as `Unexecutable` for
/// `key`, unless it already reached a terminal state for that key.
///
/// Returns the nodes that were newly marked.
pub fn mark_downstream_unexecutable(
    graph: &mut DagGraph,
    failed: NodeId,
    key: &ExecutionKey,
) -> Vec<NodeId> {
    let mut stack = graph.downstream_of(failed);
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut newly_marked = Vec::new();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Ok(node) = graph.get_mut(id) else {
            continue;
        };
        if node.status_of(key).is_terminal() {
            continue;
        }
        node.set_status(key, OperatorStatus::Unexecutable);
        debug!(
            node = %node.name,
            key = %key,
            "marking downstream node unexecutable due to upstream failure"
        );
        newly_marked.push(id);
        stack.extend(graph.downstream_of(id));
    }

    newly_marked
}

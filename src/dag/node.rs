// src/dag/node.rs

//! Operator nodes and their per-execution-key state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::dag::key::ExecutionKey;
use crate::dag::status::{OperatorStatus, aggregate};
use crate::exec::WorkUnit;
use crate::filter::Filter;
use crate::item::TaggedItem;

/// Identifier of a node (links included) within one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State recorded for one execution key.
#[derive(Debug, Clone)]
pub struct KeyState {
    pub status: OperatorStatus,
    pub inputs: Vec<TaggedItem>,
    pub results: Vec<TaggedItem>,
    pub outputs: Vec<TaggedItem>,
}

impl KeyState {
    fn pending() -> Self {
        Self {
            status: OperatorStatus::Pending,
            inputs: Vec::new(),
            results: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

/// Fan-out bookkeeping for one iterator key.
///
/// Groups are stored under the child key they run with. The counters track
/// how many `(child, group)` pairs reached each terminal state, so settling
/// the iterator never rescans its groups.
#[derive(Debug, Clone, Default)]
pub struct IteratorRun {
    pub groups: BTreeMap<ExecutionKey, Vec<TaggedItem>>,
    expected: usize,
    completed: usize,
    failed: usize,
    unexecutable: usize,
}

impl IteratorRun {
    pub(crate) fn new(groups: BTreeMap<ExecutionKey, Vec<TaggedItem>>, children: usize) -> Self {
        Self {
            expected: groups.len() * children,
            groups,
            ..Self::default()
        }
    }

    /// Count one `(child, group)` pair that just turned terminal.
    pub(crate) fn record(&mut self, status: OperatorStatus) {
        match status {
            OperatorStatus::Completed => self.completed += 1,
            OperatorStatus::Failed => self.failed += 1,
            OperatorStatus::Unexecutable => self.unexecutable += 1,
            OperatorStatus::Pending | OperatorStatus::Running => {}
        }
    }

    /// Terminal status the iterator should take for this run, once known.
    ///
    /// A failure settles the run even while other groups are still running.
    pub fn outcome(&self) -> Option<OperatorStatus> {
        if self.failed > 0 {
            Some(OperatorStatus::Failed)
        } else if self.unexecutable > 0 {
            Some(OperatorStatus::Unexecutable)
        } else if self.completed == self.expected {
            Some(OperatorStatus::Completed)
        } else {
            None
        }
    }
}

/// The different kinds of node and their kind-specific data.
pub enum NodeKind {
    /// Directed edge. Always reports `Completed`.
    Link { source: NodeId, destination: NodeId },
    /// Forwards its filtered inputs unchanged.
    Passthrough,
    /// Hands its filtered inputs to an external work unit.
    Executor { work: Arc<dyn WorkUnit> },
    /// Runs its children once per group of its inputs.
    Iterator {
        iterate_on: Filter,
        children: Vec<NodeId>,
        /// One run per enclosing key this iterator started on.
        runs: BTreeMap<ExecutionKey, IteratorRun>,
    },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Link { .. } => "link",
            NodeKind::Passthrough => "passthrough",
            NodeKind::Executor { .. } => "executor",
            NodeKind::Iterator { .. } => "iterator",
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Link {
                source,
                destination,
            } => f
                .debug_struct("Link")
                .field("source", source)
                .field("destination", destination)
                .finish(),
            NodeKind::Passthrough => f.write_str("Passthrough"),
            NodeKind::Executor { work } => f
                .debug_struct("Executor")
                .field("work", &work.name())
                .finish(),
            NodeKind::Iterator {
                iterate_on,
                children,
                runs,
            } => f
                .debug_struct("Iterator")
                .field("iterate_on", &iterate_on.to_string())
                .field("children", children)
                .field("runs", &runs.len())
                .finish(),
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub input_filters: Vec<Filter>,
    pub output_filters: Vec<Filter>,
    /// Links touching this node, as source or destination.
    pub links: Vec<NodeId>,
    /// Iterator that privately schedules this node, if any.
    pub owner: Option<NodeId>,
    states: BTreeMap<ExecutionKey, KeyState>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            input_filters: Vec::new(),
            output_filters: Vec::new(),
            links: Vec::new(),
            owner: None,
            states: BTreeMap::new(),
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, NodeKind::Link { .. })
    }

    pub fn is_iterator(&self) -> bool {
        matches!(self.kind, NodeKind::Iterator { .. })
    }

    /// Filters applied to the combined inputs before `do_job`.
    ///
    /// For executors this is the node's own filters plus the work unit's
    /// mandatory constraints, recomputed on every call.
    pub fn effective_input_filters(&self) -> Vec<Filter> {
        let mut filters = self.input_filters.clone();
        if let NodeKind::Executor { work } = &self.kind {
            for f in work.mandatory_consumes() {
                if !filters.contains(&f) {
                    filters.push(f);
                }
            }
        }
        filters
    }

    /// Children of an iterator; empty for every other kind.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Iterator { children, .. } => children,
            _ => &[],
        }
    }

    /// Status for one key; untouched keys are implicitly `Pending`.
    pub fn status_of(&self, key: &ExecutionKey) -> OperatorStatus {
        if self.is_link() {
            return OperatorStatus::Completed;
        }
        self.states
            .get(key)
            .map(|s| s.status)
            .unwrap_or(OperatorStatus::Pending)
    }

    /// Aggregate status over every key this node has seen.
    pub fn status(&self) -> OperatorStatus {
        if self.is_link() {
            return OperatorStatus::Completed;
        }
        aggregate(self.states.values().map(|s| s.status))
    }

    pub fn has_key(&self, key: &ExecutionKey) -> bool {
        self.states.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ExecutionKey> {
        self.states.keys()
    }

    pub fn statuses(&self) -> impl Iterator<Item = (&ExecutionKey, OperatorStatus)> {
        self.states.iter().map(|(k, s)| (k, s.status))
    }

    pub fn inputs_of(&self, key: &ExecutionKey) -> Option<&[TaggedItem]> {
        self.states.get(key).map(|s| s.inputs.as_slice())
    }

    pub fn results_of(&self, key: &ExecutionKey) -> Option<&[TaggedItem]> {
        self.states.get(key).map(|s| s.results.as_slice())
    }

    pub fn outputs_of(&self, key: &ExecutionKey) -> Option<&[TaggedItem]> {
        self.states.get(key).map(|s| s.outputs.as_slice())
    }

    /// Outputs across every key, in key order.
    pub fn all_outputs(&self) -> impl Iterator<Item = &TaggedItem> {
        self.states.values().flat_map(|s| s.outputs.iter())
    }

    pub(crate) fn state_mut(&mut self, key: &ExecutionKey) -> &mut KeyState {
        self.states.entry(key.clone()).or_insert_with(KeyState::pending)
    }

    /// Record `status` for `key`; returns the previous status.
    pub(crate) fn set_status(&mut self, key: &ExecutionKey, status: OperatorStatus) -> OperatorStatus {
        let state = self.state_mut(key);
        std::mem::replace(&mut state.status, status)
    }

    /// Compare-and-set `Pending -> Running` for `key`.
    pub(crate) fn try_begin(&mut self, key: &ExecutionKey) -> bool {
        let state = self.state_mut(key);
        if state.status == OperatorStatus::Pending {
            state.status = OperatorStatus::Running;
            true
        } else {
            false
        }
    }
}

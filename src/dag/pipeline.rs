// src/dag/pipeline.rs

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::key::ExecutionKey;
use crate::dag::node::{IteratorRun, Node, NodeId, NodeKind};
use crate::dag::observer::{StatusEvent, StatusObserver, TracingObserver};
use crate::dag::report::{NodeReport, PipelineReport, SchedulerStep};
use crate::dag::state_manager::{ReadinessScanner, mark_downstream_unexecutable};
use crate::dag::status::{OperatorStatus, aggregate};
use crate::errors::{Result, TagflowError};
use crate::exec::{JobOutcome, ScheduledJob, WorkUnit, WorkUnitError};
use crate::filter::{Filter, apply_filters};
use crate::grouping::{ensure_groupable, group_by};
use crate::item::{TaggedItem, unique_items};

/// What starting a node amounts to, decided while its state is borrowed.
enum Action {
    Forward,
    Dispatch(Arc<dyn WorkUnit>),
    FanOut,
}

/// Iterator run that needs another look: start whatever became ready in
/// `child_key`'s group, then check whether the run can settle.
#[derive(Debug)]
struct Wakeup {
    iterator: NodeId,
    run_key: ExecutionKey,
    child_key: Option<ExecutionKey>,
}

/// Pipeline scheduler: owns the node map and drives execution.
///
/// It is responsible for:
/// - computing the frontier of nodes that are ready to run
/// - starting nodes (a `Pending -> Running` compare-and-set per key)
/// - fanning iterator inputs out into one execution key per group
/// - recording results and outputs per key
/// - failing every downstream node of a failed node for the same key
///
/// Executor nodes are not run in here: starting one hands back a
/// [`ScheduledJob`], and the driver reports its outcome through
/// [`Pipeline::complete_job`]. The scheduler itself never fails a run; every
/// problem ends up as node state plus observer notifications.
pub struct Pipeline {
    name: String,
    graph: DagGraph,
    observers: Vec<Arc<dyn StatusObserver>>,
    wakeups: VecDeque<Wakeup>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("graph", &self.graph)
            .field("observers", &self.observers.len())
            .field("wakeups", &self.wakeups.len())
            .finish()
    }
}

impl Pipeline {
    /// Empty pipeline that logs status changes through `tracing`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: DagGraph::new(),
            observers: vec![Arc::new(TracingObserver)],
            wakeups: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_observer(&mut self, observer: Arc<dyn StatusObserver>) {
        self.observers.push(observer);
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.graph.get(id)
    }

    // ---- graph building ------------------------------------------------

    /// Node that forwards its filtered inputs unchanged.
    pub fn add_passthrough(&mut self, name: impl Into<String>) -> NodeId {
        self.graph.insert(name, NodeKind::Passthrough)
    }

    pub fn add_executor(&mut self, name: impl Into<String>, work: Arc<dyn WorkUnit>) -> NodeId {
        self.graph.insert(name, NodeKind::Executor { work })
    }

    /// Iterator fanning out over `iterate_on`. Rejects grouping filters that
    /// cannot be evaluated.
    pub fn add_iterator(&mut self, name: impl Into<String>, iterate_on: Filter) -> Result<NodeId> {
        ensure_groupable(&iterate_on)?;
        Ok(self.graph.insert(
            name,
            NodeKind::Iterator {
                iterate_on,
                children: Vec::new(),
                runs: Default::default(),
            },
        ))
    }

    /// Hand `child` over to `iterator` for private scheduling.
    ///
    /// Must be called before `child` is linked to anything.
    pub fn add_child(&mut self, iterator: NodeId, child: NodeId) -> Result<()> {
        if iterator == child {
            return Err(TagflowError::InvalidGraph(
                "an iterator cannot own itself".to_string(),
            ));
        }
        {
            let c = self.graph.get(child)?;
            if c.is_link() {
                return Err(TagflowError::InvalidGraph(format!(
                    "link {child} cannot be an iterator child"
                )));
            }
            if c.owner.is_some() {
                return Err(TagflowError::InvalidGraph(format!(
                    "node '{}' already has an owner",
                    c.name
                )));
            }
            if !c.links.is_empty() {
                return Err(TagflowError::InvalidGraph(format!(
                    "node '{}' must be added to its iterator before it is linked",
                    c.name
                )));
            }
        }

        match &mut self.graph.get_mut(iterator)?.kind {
            NodeKind::Iterator { children, .. } => children.push(child),
            _ => {
                return Err(TagflowError::InvalidGraph(format!(
                    "node {iterator} is not an iterator"
                )));
            }
        }
        self.graph.get_mut(child)?.owner = Some(iterator);
        Ok(())
    }

    pub fn add_link(&mut self, source: NodeId, destination: NodeId) -> Result<NodeId> {
        self.graph.add_link(source, destination)
    }

    pub fn add_input_filter(&mut self, id: NodeId, filter: Filter) -> Result<()> {
        self.graph.get_mut(id)?.input_filters.push(filter);
        Ok(())
    }

    pub fn add_output_filter(&mut self, id: NodeId, filter: Filter) -> Result<()> {
        self.graph.get_mut(id)?.output_filters.push(filter);
        Ok(())
    }

    // ---- scans ---------------------------------------------------------

    pub fn find_operators_without_previous(&self) -> Vec<NodeId> {
        ReadinessScanner::new(&self.graph).operators_without_previous()
    }

    pub fn find_operators_ready(&self) -> Vec<NodeId> {
        ReadinessScanner::new(&self.graph).operators_ready()
    }

    /// Whether every top-level node (links included) is terminal.
    ///
    /// Iterator children are settled before their iterator turns terminal, so
    /// they are covered through it.
    pub fn is_pipeline_done(&self) -> bool {
        let top_level: Vec<&Node> = self.graph.nodes().filter(|n| n.owner.is_none()).collect();
        let terminal = top_level.iter().filter(|n| n.status().is_terminal()).count();
        terminal == top_level.len()
    }

    /// `Failed` if any node failed, `Completed` otherwise. Unexecutable nodes
    /// alone never fail the pipeline.
    pub fn pipeline_status(&self) -> OperatorStatus {
        if self
            .graph
            .nodes()
            .any(|n| n.status() == OperatorStatus::Failed)
        {
            OperatorStatus::Failed
        } else {
            OperatorStatus::Completed
        }
    }

    /// Aggregate status of an iterator's children over the groups of its run
    /// under `run_key`. A run with nothing to schedule is `Completed`.
    pub fn children_status(&self, iterator: NodeId, run_key: &ExecutionKey) -> OperatorStatus {
        let Some(node) = self.graph.node(iterator) else {
            return OperatorStatus::Pending;
        };
        let NodeKind::Iterator { children, runs, .. } = &node.kind else {
            return OperatorStatus::Pending;
        };
        let Some(run) = runs.get(run_key) else {
            return OperatorStatus::Pending;
        };
        if run.groups.is_empty() || children.is_empty() {
            return OperatorStatus::Completed;
        }

        let statuses = run.groups.keys().flat_map(|child_key| {
            children
                .iter()
                .filter_map(|c| self.graph.node(*c))
                .map(move |c| c.status_of(child_key))
        });
        aggregate(statuses)
    }

    pub fn report(&self) -> PipelineReport {
        PipelineReport {
            status: self.pipeline_status(),
            done: self.is_pipeline_done(),
            nodes: self
                .graph
                .nodes()
                .filter(|n| !n.is_link())
                .map(|n| NodeReport {
                    id: n.id,
                    name: n.name.clone(),
                    kind: n.kind.label(),
                    status: n.status(),
                })
                .collect(),
        }
    }

    // ---- execution -----------------------------------------------------

    /// Run the whole pipeline on the calling thread.
    ///
    /// Jobs are executed one at a time in scheduling order. Use
    /// [`crate::engine::Runtime`] to run independent jobs in parallel.
    pub fn execute(&mut self, inputs: Vec<TaggedItem>) -> PipelineReport {
        let mut queue: VecDeque<ScheduledJob> = self.start(inputs).into();

        while let Some(job) = queue.pop_front() {
            let outcome = job.run();
            queue.extend(self.complete_job(outcome));
        }

        if !self.is_pipeline_done() {
            warn!(
                pipeline = %self.name,
                "no more jobs to run but pipeline is not done; some nodes can never start"
            );
        }

        let report = self.report();
        info!(
            pipeline = %self.name,
            status = ?report.status,
            "pipeline finished"
        );
        report
    }

    /// Start every node of the initial frontier with `inputs`, then everything
    /// that became ready as a consequence.
    pub fn start(&mut self, inputs: Vec<TaggedItem>) -> Vec<ScheduledJob> {
        let frontier = self.find_operators_without_previous();
        info!(
            pipeline = %self.name,
            inputs = inputs.len(),
            roots = frontier.len(),
            "starting pipeline"
        );

        let mut jobs = Vec::new();
        for id in frontier {
            self.execute_node(id, Some(inputs.clone()), ExecutionKey::Blank, &mut jobs);
        }
        jobs.extend(self.execute_next());
        jobs
    }

    /// Advance pending iterator runs, then start every top-level node that is
    /// ready, repeating until a scan finds nothing new.
    ///
    /// Calling it again without any state change in between starts nothing.
    pub fn execute_next(&mut self) -> Vec<ScheduledJob> {
        let mut jobs = Vec::new();
        loop {
            self.drain_wakeups(&mut jobs);
            let ready = self.find_operators_ready();
            if ready.is_empty() {
                break;
            }
            for id in ready {
                self.execute_node(id, None, ExecutionKey::Blank, &mut jobs);
            }
        }
        jobs
    }

    /// Feed back the outcome of a job and return the jobs it unblocked.
    pub fn complete_job(&mut self, outcome: JobOutcome) -> Vec<ScheduledJob> {
        self.finish(outcome.node, &outcome.key, outcome.result);
        self.execute_next()
    }

    /// Manual-step variant of [`Pipeline::start`].
    pub fn step_start(&mut self, inputs: Vec<TaggedItem>) -> SchedulerStep {
        self.observe_step(|p| p.start(inputs))
    }

    /// Manual-step variant of [`Pipeline::complete_job`].
    pub fn step_completion(&mut self, outcome: JobOutcome) -> SchedulerStep {
        self.observe_step(|p| p.complete_job(outcome))
    }

    fn observe_step<F>(&mut self, f: F) -> SchedulerStep
    where
        F: FnOnce(&mut Self) -> Vec<ScheduledJob>,
    {
        let was_done = self.is_pipeline_done();
        let before = self.failed_nodes();
        let newly_scheduled = f(self);
        let newly_failed = self
            .failed_nodes()
            .into_iter()
            .filter(|id| !before.contains(id))
            .collect();

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished: !was_done && self.is_pipeline_done(),
        }
    }

    fn failed_nodes(&self) -> HashSet<NodeId> {
        self.graph
            .nodes()
            .filter(|n| {
                n.statuses().any(|(_, s)| {
                    matches!(s, OperatorStatus::Failed | OperatorStatus::Unexecutable)
                })
            })
            .map(|n| n.id)
            .collect()
    }

    /// Notify observers of the current status of `id` for `key`.
    pub fn on_update_status(&self, id: NodeId, key: &ExecutionKey) {
        self.notify(id, key, None);
    }

    fn notify(&self, id: NodeId, key: &ExecutionKey, error: Option<String>) {
        let Some(node) = self.graph.node(id) else {
            return;
        };
        let event = StatusEvent {
            node: id,
            node_name: node.name.clone(),
            key: key.clone(),
            status: node.status_of(key),
            error,
        };
        for observer in &self.observers {
            observer.on_status(&event);
        }
    }

    /// The `execute` protocol for one node and one key.
    fn execute_node(
        &mut self,
        id: NodeId,
        supplied: Option<Vec<TaggedItem>>,
        key: ExecutionKey,
        jobs: &mut Vec<ScheduledJob>,
    ) {
        match self.graph.get_mut(id) {
            Ok(node) => {
                if node.is_link() {
                    return;
                }
                if !node.try_begin(&key) {
                    debug!(node = %node.name, key = %key, "already started for this key; skipping");
                    return;
                }
            }
            Err(e) => {
                error!(error = %e, "cannot execute missing node");
                return;
            }
        }
        self.on_update_status(id, &key);

        let upstream = self.graph.upstream_of(id);
        let combined = if upstream.is_empty() {
            supplied.unwrap_or_default()
        } else {
            self.gather_inputs(&upstream, &key)
        };

        let Ok(node) = self.graph.get_mut(id) else {
            return;
        };
        let filtered = apply_filters(&node.effective_input_filters(), &combined);
        debug!(
            node = %node.name,
            key = %key,
            received = combined.len(),
            accepted = filtered.len(),
            "inputs filtered"
        );
        node.state_mut(&key).inputs = filtered.clone();

        let action = match &node.kind {
            NodeKind::Link { .. } => return,
            NodeKind::Passthrough => Action::Forward,
            NodeKind::Executor { work } => Action::Dispatch(Arc::clone(work)),
            NodeKind::Iterator { .. } => Action::FanOut,
        };
        let node_name = node.name.clone();

        match action {
            Action::Forward => self.finish(id, &key, Ok(filtered)),
            Action::Dispatch(work) => jobs.push(ScheduledJob {
                node: id,
                node_name,
                key,
                inputs: filtered,
                work,
            }),
            Action::FanOut => self.begin_iterator(id, &key, &filtered),
        }
    }

    /// Union of the upstream outputs for `key`.
    ///
    /// An upstream node that never ran under `key` contributes its outputs
    /// across every key instead, so a non-iterated node can consume the
    /// per-group outputs of an iterated one.
    fn gather_inputs(&self, upstream: &[NodeId], key: &ExecutionKey) -> Vec<TaggedItem> {
        let mut combined: Vec<&TaggedItem> = Vec::new();
        for up in upstream {
            let Some(node) = self.graph.node(*up) else {
                continue;
            };
            if node.has_key(key) {
                combined.extend(node.outputs_of(key).unwrap_or_default());
            } else {
                combined.extend(node.all_outputs());
            }
        }
        unique_items(combined)
    }

    /// Group the iterator's inputs and queue one wakeup per group.
    ///
    /// Children are started from [`Pipeline::drain_wakeups`], never from in
    /// here, so fanning out does not nest calls once per group.
    fn begin_iterator(&mut self, id: NodeId, key: &ExecutionKey, inputs: &[TaggedItem]) {
        let (iterate_on, children) = match self.graph.node(id).map(|n| &n.kind) {
            Some(NodeKind::Iterator {
                iterate_on,
                children,
                ..
            }) => (iterate_on.clone(), children.clone()),
            _ => return,
        };

        let groups = match group_by(inputs, &iterate_on) {
            Ok(groups) => groups,
            Err(e) => {
                self.finish(id, key, Err(WorkUnitError::with_source("grouping failed", e)));
                return;
            }
        };

        info!(
            iterator = %id,
            key = %key,
            iterate_on = %iterate_on,
            groups = groups.len(),
            "fanning out iterator"
        );

        let groups: BTreeMap<ExecutionKey, Vec<TaggedItem>> = groups
            .into_iter()
            .map(|(group, items)| (key.child(&group), items))
            .collect();

        // Register every (child, group) pair up front so the pending work is
        // visible before the first child starts.
        for child_key in groups.keys() {
            for child in &children {
                if let Ok(c) = self.graph.get_mut(*child) {
                    c.state_mut(child_key);
                }
            }
            self.wakeups.push_back(Wakeup {
                iterator: id,
                run_key: key.clone(),
                child_key: Some(child_key.clone()),
            });
        }
        self.wakeups.push_back(Wakeup {
            iterator: id,
            run_key: key.clone(),
            child_key: None,
        });

        if let Ok(node) = self.graph.get_mut(id) {
            if let NodeKind::Iterator { runs, .. } = &mut node.kind {
                runs.insert(key.clone(), IteratorRun::new(groups, children.len()));
            }
        }
    }

    /// Work through queued wakeups until none are left. Finishing a child
    /// queues a new wakeup instead of advancing its iterator directly.
    fn drain_wakeups(&mut self, jobs: &mut Vec<ScheduledJob>) {
        while let Some(wakeup) = self.wakeups.pop_front() {
            if let Some(child_key) = &wakeup.child_key {
                self.advance_group(wakeup.iterator, child_key, jobs);
            }
            self.settle_iterator(wakeup.iterator, &wakeup.run_key);
        }
    }

    /// Start every child of `iterator` that became ready for `child_key`.
    fn advance_group(&mut self, iterator: NodeId, child_key: &ExecutionKey, jobs: &mut Vec<ScheduledJob>) {
        loop {
            let ready = ReadinessScanner::new(&self.graph).group_ready(iterator, child_key);
            if ready.is_empty() {
                break;
            }
            for child in ready {
                let supplied = if self.graph.upstream_of(child).is_empty() {
                    self.group_items(iterator, child_key)
                } else {
                    None
                };
                self.execute_node(child, supplied, child_key.clone(), jobs);
            }
        }
    }

    fn group_items(&self, iterator: NodeId, child_key: &ExecutionKey) -> Option<Vec<TaggedItem>> {
        let NodeKind::Iterator { runs, .. } = &self.graph.node(iterator)?.kind else {
            return None;
        };
        runs.get(&child_key.parent())?.groups.get(child_key).cloned()
    }

    /// Settle the run of `iterator` under `run_key` once its children's
    /// counters say so.
    fn settle_iterator(&mut self, iterator: NodeId, run_key: &ExecutionKey) {
        let Some(node) = self.graph.node(iterator) else {
            return;
        };
        if node.status_of(run_key) != OperatorStatus::Running {
            return;
        }
        let outcome = match &node.kind {
            NodeKind::Iterator { runs, .. } => runs.get(run_key).and_then(IteratorRun::outcome),
            _ => None,
        };

        match outcome {
            Some(OperatorStatus::Completed) => {
                let results = self.iterator_results(iterator, run_key);
                self.finish(iterator, run_key, Ok(results));
            }
            Some(OperatorStatus::Failed) => {
                let error = WorkUnitError::new("one or more iterator children failed");
                self.finish(iterator, run_key, Err(error));
            }
            Some(OperatorStatus::Unexecutable) => {
                if let Ok(node) = self.graph.get_mut(iterator) {
                    node.set_status(run_key, OperatorStatus::Unexecutable);
                }
                self.on_update_status(iterator, run_key);
                self.record_terminal(iterator, run_key);
                for marked in mark_downstream_unexecutable(&mut self.graph, iterator, run_key) {
                    self.on_update_status(marked, run_key);
                    self.record_terminal(marked, run_key);
                }
            }
            Some(OperatorStatus::Pending | OperatorStatus::Running) | None => {}
        }
    }

    /// Outputs of the iterator's sink children (those with no downstream
    /// sibling), across every group of the run.
    fn iterator_results(&self, iterator: NodeId, run_key: &ExecutionKey) -> Vec<TaggedItem> {
        let Some(NodeKind::Iterator { children, runs, .. }) = self.graph.node(iterator).map(|n| &n.kind) else {
            return Vec::new();
        };
        let Some(run) = runs.get(run_key) else {
            return Vec::new();
        };

        let sinks: Vec<&Node> = children
            .iter()
            .copied()
            .filter(|c| self.graph.downstream_of(*c).is_empty())
            .filter_map(|c| self.graph.node(c))
            .collect();

        unique_items(run.groups.keys().flat_map(|child_key| {
            sinks
                .iter()
                .flat_map(move |sink| sink.outputs_of(child_key).unwrap_or_default())
        }))
    }

    /// Record the result of `do_job` for a running key.
    fn finish(
        &mut self,
        id: NodeId,
        key: &ExecutionKey,
        result: std::result::Result<Vec<TaggedItem>, WorkUnitError>,
    ) {
        let Ok(node) = self.graph.get_mut(id) else {
            warn!(node = %id, "completion for unknown node; ignoring");
            return;
        };
        if node.status_of(key) != OperatorStatus::Running {
            warn!(
                node = %node.name,
                key = %key,
                status = ?node.status_of(key),
                "completion for a key that is not running; ignoring"
            );
            return;
        }

        match result {
            Ok(results) => {
                let outputs = apply_filters(&node.output_filters, &results);
                let state = node.state_mut(key);
                state.results = results;
                state.outputs = outputs;
                state.status = OperatorStatus::Completed;
                self.on_update_status(id, key);
                self.record_terminal(id, key);
            }
            Err(e) => {
                node.set_status(key, OperatorStatus::Failed);
                self.notify(id, key, Some(e.to_string()));
                self.record_terminal(id, key);

                for marked in mark_downstream_unexecutable(&mut self.graph, id, key) {
                    self.on_update_status(marked, key);
                    self.record_terminal(marked, key);
                }
            }
        }
    }

    /// A key of `id` just turned terminal: count it in the owning iterator's
    /// run and queue that group for another look.
    ///
    /// Top-level nodes need nothing here; the `execute_next` re-scan picks up
    /// whatever became ready.
    fn record_terminal(&mut self, id: NodeId, key: &ExecutionKey) {
        let Some(node) = self.graph.node(id) else {
            return;
        };
        let (Some(owner), status) = (node.owner, node.status_of(key)) else {
            return;
        };
        let run_key = key.parent();

        let Ok(owner_node) = self.graph.get_mut(owner) else {
            return;
        };
        let NodeKind::Iterator { runs, .. } = &mut owner_node.kind else {
            return;
        };
        let Some(run) = runs.get_mut(&run_key) else {
            return;
        };
        run.record(status);

        self.wakeups.push_back(Wakeup {
            iterator: owner,
            run_key,
            child_key: Some(key.clone()),
        });
    }
}

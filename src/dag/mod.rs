// src/dag/mod.rs

//! Operator graph representation and scheduling.
//!
//! - [`key`] defines execution keys (one per run of a node).
//! - [`status`] holds operator statuses and their aggregation.
//! - [`node`] holds nodes, their kinds and per-key state.
//! - [`graph`] is the flat node map with link-derived topology.
//! - [`state_manager`] contains readiness scans and failure propagation.
//! - [`pipeline`] is the scheduler driving execution.
//! - [`observer`] defines status observers.
//! - [`report`] defines step and run result types.
//! - [`validate`] checks a built graph for structural problems.

pub mod graph;
pub mod key;
pub mod node;
pub mod observer;
pub mod pipeline;
pub mod report;
pub mod state_manager;
pub mod status;
pub mod validate;

pub use graph::DagGraph;
pub use key::{ExecutionKey, execution_key, filters_of};
pub use node::{IteratorRun, KeyState, Node, NodeId, NodeKind};
pub use observer::{StatusEvent, StatusLog, StatusObserver, TracingObserver};
pub use pipeline::Pipeline;
pub use report::{NodeReport, PipelineReport, SchedulerStep};
pub use status::{OperatorStatus, aggregate};

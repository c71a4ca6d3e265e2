// src/lib.rs

//! Execution core for graphs of operators over tagged items.
//!
//! A [`dag::Pipeline`] holds operator nodes joined by links. Running it starts
//! every node without an incoming link, then keeps starting nodes whose
//! upstream nodes have all completed, until every node is terminal. Iterator
//! nodes partition their inputs into groups (see [`grouping`]) and run their
//! children once per group, each under its own execution key. A failure marks
//! everything downstream of it unexecutable for the same key, while
//! independent branches keep running.

pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod filter;
pub mod grouping;
pub mod item;
pub mod logging;
pub mod types;

use tokio::sync::mpsc;
use tracing::info;

use crate::dag::Pipeline;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::Result;
use crate::exec::BlockingPoolBackend;
use crate::item::TaggedItem;

/// High-level entry point: run `pipeline` on `inputs` with parallel work
/// units and return it once every node is terminal.
///
/// This wires together:
/// - the runtime event channel
/// - the blocking-pool executor backend
/// - the pure core runtime and its async shell
pub async fn run_pipeline(
    pipeline: Pipeline,
    inputs: Vec<TaggedItem>,
    options: RuntimeOptions,
) -> Result<Pipeline> {
    info!(
        pipeline = %pipeline.name(),
        max_concurrency = options.max_concurrency,
        "running pipeline"
    );

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(options.event_channel_capacity.max(1));
    let executor = BlockingPoolBackend::new(rt_tx, options.max_concurrency);

    let core = CoreRuntime::new(pipeline);
    let runtime = Runtime::new(core, rt_rx, executor);
    runtime.run(inputs).await
}

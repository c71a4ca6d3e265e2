// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running jobs itself.
//! This makes it easy to swap in a fake executor in tests.
//!
//! - `BlockingPoolBackend` is the default implementation. Every job runs on
//!   Tokio's blocking thread pool, at most `max_concurrency` at a time, and
//!   its outcome is sent back as `RuntimeEvent::JobCompleted`.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which jobs were dispatched and completes them in a chosen order.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::exec::job::{JobOutcome, ScheduledJob};
use crate::exec::work_unit::WorkUnitError;

/// Trait abstracting how scheduled jobs are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given jobs for execution.
    ///
    /// Implementations must eventually deliver exactly one
    /// `RuntimeEvent::JobCompleted` per job.
    fn dispatch(
        &mut self,
        jobs: Vec<ScheduledJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs jobs on the blocking thread pool with bounded concurrency.
#[derive(Debug)]
pub struct BlockingPoolBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    permits: Arc<Semaphore>,
}

impl BlockingPoolBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, max_concurrency: usize) -> Self {
        Self {
            runtime_tx,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }
}

impl ExecutorBackend for BlockingPoolBackend {
    fn dispatch(
        &mut self,
        jobs: Vec<ScheduledJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let permits = Arc::clone(&self.permits);

        Box::pin(async move {
            for job in jobs {
                let tx = tx.clone();
                let permits = Arc::clone(&permits);

                tokio::spawn(async move {
                    let node = job.node;
                    let key = job.key.clone();
                    let name = job.node_name.clone();

                    let outcome = match permits.acquire_owned().await {
                        Ok(_permit) => match tokio::task::spawn_blocking(move || job.run()).await {
                            Ok(outcome) => outcome,
                            Err(e) => JobOutcome::failed(
                                node,
                                key,
                                WorkUnitError::new(format!("work unit task aborted: {e}")),
                            ),
                        },
                        Err(e) => JobOutcome::failed(
                            node,
                            key,
                            WorkUnitError::new(format!("executor pool closed: {e}")),
                        ),
                    };

                    debug!(node = %name, ok = outcome.result.is_ok(), "job finished");
                    if tx.send(RuntimeEvent::JobCompleted(outcome)).await.is_err() {
                        warn!(node = %name, "runtime stopped before job completion was delivered");
                    }
                });
            }
            Ok(())
        })
    }
}

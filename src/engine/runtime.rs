// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::Pipeline;
use crate::errors::Result;
use crate::exec::{ExecutorBackend, ScheduledJob};
use crate::item::TaggedItem;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Async event loop around a [`CoreRuntime`].
///
/// Completions arrive on `event_rx` and are handed to the core one at a
/// time; the jobs the core asks for go to the `ExecutorBackend`.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Run the pipeline on `inputs` until it is done, then hand it back.
    ///
    /// - Seeds the core with the inputs.
    /// - Consumes `RuntimeEvent`s from `event_rx` one at a time.
    /// - Executes commands returned by the core (dispatch jobs, exit).
    pub async fn run(mut self, inputs: Vec<TaggedItem>) -> Result<Pipeline> {
        info!(pipeline = %self.core.pipeline().name(), "runtime started");

        let step = self.core.start(inputs);
        let mut keep_running = self.apply(step).await?;

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            keep_running = self.apply(step).await?;
        }

        info!(
            in_flight = self.core.in_flight(),
            "runtime exiting"
        );
        Ok(self.core.into_pipeline())
    }

    /// Execute the commands of one core step; returns whether to keep going.
    async fn apply(&mut self, step: CoreStep) -> Result<bool> {
        for command in step.commands {
            match command {
                CoreCommand::DispatchJobs(jobs) => self.dispatch(jobs).await?,
                CoreCommand::RequestExit => {
                    debug!("core issued RequestExit command");
                }
            }
        }
        Ok(step.keep_running)
    }

    async fn dispatch(&mut self, jobs: Vec<ScheduledJob>) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = jobs.iter().map(|j| j.node_name.as_str()).collect();
        let keys: Vec<_> = jobs.iter().map(|j| j.key.to_string()).collect();
        debug!(?names, ?keys, "dispatching ready jobs");

        self.executor.dispatch(jobs).await
    }
}

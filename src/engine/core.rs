// src/engine/core.rs

//! Synchronous half of the engine.
//!
//! [`CoreRuntime`] owns the pipeline and a count of dispatched jobs. Each
//! [`RuntimeEvent`] it is fed turns into a [`CoreStep`]: jobs to dispatch and
//! whether the loop should go on. Channels, tasks and the executor backend all
//! live in [`crate::engine::runtime`], so this part can be driven by hand in
//! tests.

use crate::dag::Pipeline;
use crate::engine::RuntimeEvent;
use crate::engine::event_handlers::{CoreStep, handle_job_completion, handle_start};
use crate::item::TaggedItem;

/// Pipeline plus the number of jobs whose outcome has not arrived yet.
#[derive(Debug)]
pub struct CoreRuntime {
    pipeline: Pipeline,
    in_flight: usize,
}

impl CoreRuntime {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            in_flight: 0,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn into_pipeline(self) -> Pipeline {
        self.pipeline
    }

    /// Jobs dispatched but not yet completed.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Seed the run with the pipeline inputs.
    pub fn start(&mut self, inputs: Vec<TaggedItem>) -> CoreStep {
        handle_start(&mut self.pipeline, &mut self.in_flight, inputs)
    }

    /// Apply one event and say what the shell should do next.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::JobCompleted(outcome) => {
                handle_job_completion(&mut self.pipeline, &mut self.in_flight, outcome)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

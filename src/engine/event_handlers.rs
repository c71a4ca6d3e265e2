// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{info, warn};

use crate::dag::Pipeline;
use crate::exec::{JobOutcome, ScheduledJob};
use crate::item::TaggedItem;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these jobs to the executor backend.
    DispatchJobs(Vec<ScheduledJob>),
    /// The run is over; stop the event loop.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Start the pipeline frontier.
pub fn handle_start(
    pipeline: &mut Pipeline,
    in_flight: &mut usize,
    inputs: Vec<TaggedItem>,
) -> CoreStep {
    let jobs = pipeline.start(inputs);
    after_scheduling(pipeline, in_flight, jobs)
}

/// Handle a job completion event.
pub fn handle_job_completion(
    pipeline: &mut Pipeline,
    in_flight: &mut usize,
    outcome: JobOutcome,
) -> CoreStep {
    *in_flight = in_flight.saturating_sub(1);
    let jobs = pipeline.complete_job(outcome);
    after_scheduling(pipeline, in_flight, jobs)
}

/// Turn newly scheduled jobs into commands, and decide whether the run is
/// over.
///
/// With nothing in flight and nothing new to dispatch, no further event can
/// arrive: either the pipeline is done, or it is stuck.
fn after_scheduling(
    pipeline: &Pipeline,
    in_flight: &mut usize,
    jobs: Vec<ScheduledJob>,
) -> CoreStep {
    let mut commands = Vec::new();

    if !jobs.is_empty() {
        *in_flight += jobs.len();
        commands.push(CoreCommand::DispatchJobs(jobs));
    }

    let mut keep_running = true;
    if *in_flight == 0 {
        if pipeline.is_pipeline_done() {
            info!(
                pipeline = %pipeline.name(),
                status = ?pipeline.pipeline_status(),
                "pipeline done"
            );
        } else {
            warn!(
                pipeline = %pipeline.name(),
                "no jobs in flight but pipeline is not done; stopping"
            );
        }
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

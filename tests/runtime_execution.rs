use std::error::Error;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use tagflow::dag::{OperatorStatus, Pipeline};
use tagflow::engine::{CoreCommand, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use tagflow::exec::{FnWorkUnit, WorkUnitError};
use tagflow::filter::Filter;
use tagflow::item::TaggedItem;
use tagflow::run_pipeline;
use tagflow_test_utils::builders::{many_series_items, two_series_items};
use tagflow_test_utils::fake_backend::FakeBackend;
use tagflow_test_utils::work_units::{echo, failing};
use tagflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn per_series_pipeline() -> Result<Pipeline, Box<dyn Error>> {
    let mut p = Pipeline::new("per-series");
    let source = p.add_passthrough("Source");
    let e = p.add_executor("E", echo("E"));
    let i = p.add_iterator("I", Filter::tag("SeriesDescription"))?;
    let f = p.add_executor("F", echo("F"));
    p.add_child(i, f)?;
    p.add_link(source, e)?;
    p.add_link(e, i)?;
    Ok(p)
}

#[tokio::test]
async fn fake_backend_sees_one_job_per_group() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeBackend::new(tx, Arc::clone(&dispatched));

    let runtime = Runtime::new(CoreRuntime::new(per_series_pipeline()?), rx, backend);
    let pipeline = with_timeout(runtime.run(two_series_items())).await?;

    assert!(pipeline.is_pipeline_done());
    assert_eq!(pipeline.pipeline_status(), OperatorStatus::Completed);

    let dispatched = dispatched.lock().unwrap().clone();
    let names: Vec<&str> = dispatched.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names.iter().filter(|n| **n == "E").count(), 1);
    assert_eq!(names.iter().filter(|n| **n == "F").count(), 2);
    assert_eq!(names.first(), Some(&"E"));

    let f_keys: Vec<&str> = dispatched
        .iter()
        .filter(|(n, _)| n == "F")
        .map(|(_, k)| k.as_str())
        .collect();
    assert!(f_keys.iter().any(|k| k.contains("axial")));
    assert!(f_keys.iter().any(|k| k.contains("sagittal")));
    Ok(())
}

#[tokio::test]
async fn fake_backend_batch_larger_than_event_channel_completes() -> TestResult {
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(1);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeBackend::new(tx, Arc::clone(&dispatched));

    let runtime = Runtime::new(CoreRuntime::new(per_series_pipeline()?), rx, backend);
    let pipeline = with_timeout(runtime.run(many_series_items(20))).await?;

    assert!(pipeline.is_pipeline_done());
    assert_eq!(pipeline.pipeline_status(), OperatorStatus::Completed);
    let f_jobs = dispatched.lock().unwrap().iter().filter(|(n, _)| n == "F").count();
    assert_eq!(f_jobs, 20);
    Ok(())
}

#[tokio::test]
async fn blocking_pool_runs_the_whole_pipeline() -> TestResult {
    init_tracing();

    let pipeline = with_timeout(run_pipeline(
        per_series_pipeline()?,
        two_series_items(),
        RuntimeOptions::default(),
    ))
    .await?;

    let report = pipeline.report();
    assert!(report.done);
    assert_eq!(report.status, OperatorStatus::Completed);
    assert_eq!(report.count(OperatorStatus::Completed), 4);
    Ok(())
}

#[tokio::test]
async fn blocking_pool_reports_failures_without_stopping_other_branches() -> TestResult {
    let mut p = Pipeline::new("mixed");
    let src = p.add_passthrough("source");
    let bad = p.add_executor("bad", failing("bad", "disk on fire"));
    let after_bad = p.add_executor("after-bad", echo("after-bad"));
    let good = p.add_executor("good", echo("good"));
    p.add_link(src, bad)?;
    p.add_link(bad, after_bad)?;
    p.add_link(src, good)?;

    let options = RuntimeOptions {
        max_concurrency: 1,
        event_channel_capacity: 4,
    };
    let pipeline = with_timeout(run_pipeline(p, two_series_items(), options)).await?;

    assert_eq!(pipeline.node(bad)?.status(), OperatorStatus::Failed);
    assert_eq!(pipeline.node(after_bad)?.status(), OperatorStatus::Unexecutable);
    assert_eq!(pipeline.node(good)?.status(), OperatorStatus::Completed);
    assert_eq!(pipeline.pipeline_status(), OperatorStatus::Failed);
    assert!(pipeline.is_pipeline_done());
    Ok(())
}

/// Work unit that only succeeds if `expected` units are inside `run` at the
/// same time.
fn rendezvous(name: &str, gate: Arc<(Mutex<usize>, Condvar)>, expected: usize) -> Arc<FnWorkUnit> {
    Arc::new(FnWorkUnit::new(name, move |items: Vec<TaggedItem>| {
        let (lock, cvar) = &*gate;
        let mut arrived = lock.lock().unwrap();
        *arrived += 1;
        cvar.notify_all();
        let (arrived, timeout) = cvar
            .wait_timeout_while(arrived, Duration::from_secs(2), |n| *n < expected)
            .unwrap();
        if timeout.timed_out() && *arrived < expected {
            return Err(WorkUnitError::new("peers never arrived"));
        }
        Ok(items)
    }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn independent_work_units_run_concurrently() -> TestResult {
    let gate = Arc::new((Mutex::new(0usize), Condvar::new()));

    let mut p = Pipeline::new("parallel");
    let left = p.add_executor("left", rendezvous("left", Arc::clone(&gate), 2));
    let right = p.add_executor("right", rendezvous("right", Arc::clone(&gate), 2));

    let options = RuntimeOptions {
        max_concurrency: 2,
        event_channel_capacity: 8,
    };
    let pipeline = with_timeout(run_pipeline(p, vec![TaggedItem::new("x")], options)).await?;

    assert_eq!(pipeline.node(left)?.status(), OperatorStatus::Completed);
    assert_eq!(pipeline.node(right)?.status(), OperatorStatus::Completed);
    Ok(())
}

#[test]
fn core_runtime_tracks_in_flight_jobs() -> TestResult {
    let mut p = Pipeline::new("core");
    let a = p.add_executor("A", echo("A"));
    let b = p.add_executor("B", echo("B"));
    p.add_link(a, b)?;

    let mut core = CoreRuntime::new(p);
    let step = core.start(vec![TaggedItem::new("x")]);
    assert!(step.keep_running);
    assert_eq!(core.in_flight(), 1);

    let job = match step.commands.as_slice() {
        [CoreCommand::DispatchJobs(jobs)] => jobs[0].clone(),
        other => panic!("expected a single dispatch, got {other:?}"),
    };

    let step = core.step(RuntimeEvent::JobCompleted(job.run()));
    assert!(step.keep_running);
    assert_eq!(core.in_flight(), 1);
    let job = match step.commands.as_slice() {
        [CoreCommand::DispatchJobs(jobs)] => jobs[0].clone(),
        other => panic!("expected a single dispatch, got {other:?}"),
    };
    assert_eq!(job.node, b);

    let step = core.step(RuntimeEvent::JobCompleted(job.run()));
    assert!(!step.keep_running);
    assert!(matches!(step.commands.as_slice(), [CoreCommand::RequestExit]));
    assert_eq!(core.in_flight(), 0);
    assert!(core.pipeline().is_pipeline_done());
    Ok(())
}

#[test]
fn shutdown_request_stops_the_core() {
    let mut core = CoreRuntime::new(Pipeline::new("idle"));
    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(!step.keep_running);
    assert!(step.commands.is_empty());
}

#[test]
fn empty_pipeline_exits_immediately() {
    let mut core = CoreRuntime::new(Pipeline::new("empty"));
    let step = core.start(two_series_items());
    assert!(!step.keep_running);
    assert!(core.pipeline().is_pipeline_done());
}

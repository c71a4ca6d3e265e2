use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tagflow::engine::RuntimeEvent;
use tagflow::errors::Result;
use tagflow::exec::{ExecutorBackend, ScheduledJob};

/// A fake executor backend that:
/// - records the node name and key of every dispatched job
/// - runs each job inline, then reports the outcomes in dispatch order from a
///   spawned task, so a batch larger than the event channel cannot block the
///   runtime loop that drains it.
pub struct FakeBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    dispatched: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeBackend {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        dispatched: Arc<Mutex<Vec<(String, String)>>>,
    ) -> Self {
        Self { runtime_tx, dispatched }
    }
}

impl ExecutorBackend for FakeBackend {
    fn dispatch(
        &mut self,
        jobs: Vec<ScheduledJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);

        Box::pin(async move {
            let mut outcomes = Vec::with_capacity(jobs.len());
            for job in jobs {
                {
                    let mut guard = dispatched.lock().unwrap();
                    guard.push((job.node_name.clone(), job.key.to_string()));
                }
                outcomes.push(job.run());
            }

            tokio::spawn(async move {
                for outcome in outcomes {
                    if tx.send(RuntimeEvent::JobCompleted(outcome)).await.is_err() {
                        break;
                    }
                }
            });
            Ok(())
        })
    }
}

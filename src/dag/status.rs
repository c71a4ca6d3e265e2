// src/dag/status.rs

//! Operator status and the fixed-precedence aggregation over per-key states.

/// Status of a node for one execution key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// Blocked by an upstream failure for the same key.
    Unexecutable,
}

impl OperatorStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperatorStatus::Completed | OperatorStatus::Failed | OperatorStatus::Unexecutable
        )
    }
}

/// Fold a set of per-key statuses into one.
///
/// Precedence, first rule wins:
/// 1. all completed => `Completed`
/// 2. any failed => `Failed`
/// 3. any unexecutable => `Unexecutable`
/// 4. any running => `Running`
/// 5. all pending (or empty) => `Pending`
///
/// A mix of completed and pending keys with nothing else is work in
/// progress and reports `Running`.
pub fn aggregate<I>(statuses: I) -> OperatorStatus
where
    I: IntoIterator<Item = OperatorStatus>,
{
    let mut seen_any = false;
    let mut all_completed = true;
    let mut all_pending = true;
    let mut failed = false;
    let mut unexecutable = false;
    let mut running = false;

    for status in statuses {
        seen_any = true;
        all_completed &= status == OperatorStatus::Completed;
        all_pending &= status == OperatorStatus::Pending;
        match status {
            OperatorStatus::Failed => failed = true,
            OperatorStatus::Unexecutable => unexecutable = true,
            OperatorStatus::Running => running = true,
            OperatorStatus::Pending | OperatorStatus::Completed => {}
        }
    }

    if !seen_any {
        OperatorStatus::Pending
    } else if all_completed {
        OperatorStatus::Completed
    } else if failed {
        OperatorStatus::Failed
    } else if unexecutable {
        OperatorStatus::Unexecutable
    } else if running {
        OperatorStatus::Running
    } else if all_pending {
        OperatorStatus::Pending
    } else {
        OperatorStatus::Running
    }
}

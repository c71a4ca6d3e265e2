// src/exec/mod.rs

//! Work execution layer.
//!
//! - [`work_unit`] defines the external `WorkUnit` contract and a closure
//!   based implementation.
//! - [`job`] holds the scheduled job handed out by the scheduler and the
//!   outcome fed back into it.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `BlockingPoolBackend` the async runtime uses by default, which tests can
//!   replace with a fake implementation.

pub mod backend;
pub mod job;
pub mod work_unit;

pub use backend::{BlockingPoolBackend, ExecutorBackend};
pub use job::{JobOutcome, ScheduledJob};
pub use work_unit::{FnWorkUnit, WorkUnit, WorkUnitError};

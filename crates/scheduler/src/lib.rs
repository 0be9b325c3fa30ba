//! Crontide: a cron-style in-process task scheduler.
//!
//! Patterns in 5-field cron syntax (with lists, ranges, steps, aliases,
//! `L`, and `|`-separated alternatives) are matched against every
//! whole-minute tick; matching tasks run as independent concurrent
//! executions with cooperative pause, cooperative stop, progress
//! reporting, and per-execution failure isolation.
//!
//! The moving parts:
//! - [`Scheduler`]: registry and lifecycle. `start()` spawns a timer loop
//!   that fires one launcher per minute; `stop()` winds everything down
//!   and waits for every worker to exit.
//! - [`Task`]: the capability contract a schedulable body implements
//!   ([`FnTask`] adapts an async closure).
//! - [`TaskExecutor`]: handle to one running invocation.
//! - [`TaskSource`]: external provider of (pattern, task) pairs, queried
//!   once per tick alongside the built-in in-memory source.
//! - [`SchedulerListener`] / [`ExecutionListener`]: capability-style
//!   callbacks for lifecycle and progress events.
//!
//! Pattern parsing and prediction live in `crontide-pattern` and are
//! re-exported here.

mod builder;
mod context;
mod error;
mod executor;
mod launcher;
mod listener;
mod scheduler;
mod source;
mod task;
mod timer;

pub use builder::SchedulerBuilder;
pub use context::ExecutionContext;
pub use error::{Error, Result};
pub use executor::{ExecutorState, TaskExecutor};
pub use listener::{ExecutionListener, SchedulerListener};
pub use scheduler::Scheduler;
pub use source::{TaskSource, TaskTable};
pub use task::{FnTask, Task};

pub use crontide_pattern::{
    MatcherGroup, PatternError, Predictor, SchedulingPattern, ValueMatcher,
};

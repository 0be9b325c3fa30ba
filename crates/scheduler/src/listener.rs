//! Listener capability traits.
//!
//! Every method has a default no-op body, so a listener implements only
//! the callbacks it cares about. Callbacks are synchronous and are invoked
//! at the moment the event happens; long reactions belong in work the
//! listener spawns itself.

use crate::error::Error;
use crate::executor::TaskExecutor;

/// Scheduler-level lifecycle notifications.
pub trait SchedulerListener: Send + Sync {
    /// A matched or directly launched task is about to start.
    fn task_launching(&self, _executor: &TaskExecutor) {}

    /// The task body returned successfully.
    fn task_succeeded(&self, _executor: &TaskExecutor) {}

    /// The task body failed; the error never propagates past this call.
    fn task_failed(&self, _executor: &TaskExecutor, _error: &Error) {}
}

/// Notifications about one executor's control flow and progress.
pub trait ExecutionListener: Send + Sync {
    fn execution_pausing(&self, _executor: &TaskExecutor) {}

    fn execution_resuming(&self, _executor: &TaskExecutor) {}

    fn execution_stopping(&self, _executor: &TaskExecutor) {}

    /// The worker has exited; `error` is the recorded failure, if any.
    fn execution_terminated(&self, _executor: &TaskExecutor, _error: Option<&Error>) {}

    fn status_message_changed(&self, _executor: &TaskExecutor, _message: &str) {}

    fn completeness_value_changed(&self, _executor: &TaskExecutor, _value: f64) {}
}

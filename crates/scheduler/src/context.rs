//! Execution-side view of a running task: cooperative stop and pause
//! signals, plus progress reporting.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

use crate::executor::TaskExecutor;

/// Cooperative stop signal, checked by the task body at safe points.
#[derive(Debug, Default)]
pub(crate) struct StopToken {
    stopped: AtomicBool,
}

impl StopToken {
    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Cooperative pause gate: the worker parks here while a pause is
/// requested and wakes when the request is released.
#[derive(Debug, Default)]
pub(crate) struct PauseGate {
    requested: AtomicBool,
    resume: Notify,
}

impl PauseGate {
    pub(crate) fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Clear the request and wake parked workers.
    pub(crate) fn release(&self) {
        self.requested.store(false, Ordering::Release);
        self.resume.notify_waiters();
    }

    /// Wake parked workers without clearing the request, so they can
    /// observe a stop while still paused.
    pub(crate) fn interrupt(&self) {
        self.resume.notify_waiters();
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Park until the pause request is released or `stop` is set. Returns
    /// immediately when no pause is pending.
    pub(crate) async fn wait_while_paused(&self, stop: &StopToken) {
        loop {
            if !self.is_requested() || stop.is_stopped() {
                return;
            }
            let notified = self.resume.notified();
            tokio::pin!(notified);
            // Register interest before re-checking, so a release landing
            // between the check and the await cannot be missed.
            notified.as_mut().enable();
            if !self.is_requested() || stop.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// Handed to [`Task::execute`]; the body's only view of its executor.
///
/// Cheap to clone. Pause and stop are purely cooperative: the scheduler
/// sets the signals, the body honors them at its own safe points.
///
/// [`Task::execute`]: crate::Task::execute
#[derive(Clone)]
pub struct ExecutionContext {
    executor: TaskExecutor,
}

impl ExecutionContext {
    pub(crate) fn new(executor: TaskExecutor) -> Self {
        Self { executor }
    }

    /// The executor driving this invocation.
    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// True once a stop has been requested; the body should unwind.
    pub fn is_stopped(&self) -> bool {
        self.executor.is_stopped()
    }

    /// Park while a pause is requested; returns immediately otherwise.
    /// Also returns when a stop arrives, so a paused body can unwind.
    pub async fn pause_if_requested(&self) {
        self.executor.wait_while_paused().await;
    }

    /// Publish a status message. Fans out synchronously to execution
    /// listeners before returning.
    pub fn set_status_message(&self, message: impl Into<String>) {
        self.executor.publish_status_message(message.into());
    }

    /// Publish a completeness value, clamped to `[0, 1]`. Fans out
    /// synchronously to execution listeners before returning.
    pub fn set_completeness(&self, value: f64) {
        self.executor.publish_completeness(value);
    }
}

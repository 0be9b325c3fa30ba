//! Task executors: one concurrent worker per task invocation.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::context::{ExecutionContext, PauseGate, StopToken};
use crate::error::{Error, Result};
use crate::listener::{ExecutionListener, SchedulerListener};
use crate::task::Task;

/// The scheduler's listener list, shared with every executor it spawns so
/// workers can report lifecycle events without reaching into the scheduler.
pub(crate) type SharedSchedulerListeners = Arc<Mutex<Vec<Arc<dyn SchedulerListener>>>>;

/// The scheduler's live-executor set. A worker removes itself the moment
/// it terminates, so the set never holds an exited execution.
pub(crate) type ExecutorRegistry = Arc<Mutex<HashMap<Uuid, TaskExecutor>>>;

/// Lifecycle of one task invocation.
///
/// `Terminated` is final: a terminated executor is never restarted, and no
/// later transition can leave the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorState {
    Created,
    Running,
    Paused,
    Stopping,
    Terminated,
}

impl ExecutorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

struct ExecutorInner {
    id: Uuid,
    task: Arc<dyn Task>,
    state: Mutex<ExecutorState>,
    status_message: Mutex<Option<String>>,
    completeness: Mutex<Option<f64>>,
    stop: StopToken,
    pause: PauseGate,
    listeners: Mutex<Vec<Arc<dyn ExecutionListener>>>,
    scheduler_listeners: SharedSchedulerListeners,
    registry: ExecutorRegistry,
    started_at: DateTime<Utc>,
    handle: Mutex<Option<JoinHandle<()>>>,
    terminated: watch::Sender<bool>,
}

/// Handle to one task invocation.
///
/// Cheap to clone; every clone observes the same execution. Control
/// operations are cooperative: `pause` and `stop` set signals the task
/// body polls through its [`ExecutionContext`], they never preempt.
#[derive(Clone)]
pub struct TaskExecutor {
    inner: Arc<ExecutorInner>,
}

impl TaskExecutor {
    /// Spawn a worker for `task`. The executor registers itself in the
    /// live set and fires `task_launching` before the worker starts.
    pub(crate) fn spawn(
        task: Arc<dyn Task>,
        scheduler_listeners: SharedSchedulerListeners,
        registry: ExecutorRegistry,
    ) -> TaskExecutor {
        let (terminated, _) = watch::channel(false);
        let executor = TaskExecutor {
            inner: Arc::new(ExecutorInner {
                id: Uuid::new_v4(),
                task,
                state: Mutex::new(ExecutorState::Created),
                status_message: Mutex::new(None),
                completeness: Mutex::new(None),
                stop: StopToken::default(),
                pause: PauseGate::default(),
                listeners: Mutex::new(Vec::new()),
                scheduler_listeners,
                registry: registry.clone(),
                started_at: Utc::now(),
                handle: Mutex::new(None),
                terminated,
            }),
        };

        registry.lock().insert(executor.id(), executor.clone());
        executor.notify_scheduler(|listener, ex| listener.task_launching(ex));

        let worker = executor.clone();
        let handle = tokio::spawn(async move { worker.run().await });
        *executor.inner.handle.lock() = Some(handle);
        executor
    }

    async fn run(self) {
        self.set_state(ExecutorState::Running);
        tracing::debug!(executor_id = %self.id(), "task execution starting");

        let ctx = ExecutionContext::new(self.clone());
        let outcome = match AssertUnwindSafe(self.inner.task.execute(&ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(error),
            Err(panic) => Err(Error::Task(panic_message(panic.as_ref()))),
        };

        match &outcome {
            Ok(()) => {
                tracing::debug!(executor_id = %self.id(), "task execution succeeded");
                self.notify_scheduler(|listener, ex| listener.task_succeeded(ex));
            }
            Err(error) => {
                // Failures stay isolated in this worker; without a listener
                // they would vanish, so the log is the fallback channel.
                let delivered =
                    self.notify_scheduler(|listener, ex| listener.task_failed(ex, error));
                if !delivered {
                    tracing::error!(
                        executor_id = %self.id(),
                        error = %error,
                        "task failed with no listener registered"
                    );
                }
            }
        }

        self.set_state(ExecutorState::Terminated);
        self.inner.registry.lock().remove(&self.id());
        self.notify_execution(|listener, ex| {
            listener.execution_terminated(ex, outcome.as_ref().err())
        });
        let _ = self.inner.terminated.send_replace(true);
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn state(&self) -> ExecutorState {
        *self.inner.state.lock()
    }

    /// True until the worker has terminated.
    pub fn is_alive(&self) -> bool {
        !self.state().is_terminal()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stop.is_stopped()
    }

    /// When the executor was spawned.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Latest status message published by the task body, if any.
    pub fn status_message(&self) -> Option<String> {
        self.inner.status_message.lock().clone()
    }

    /// Latest completeness value published by the task body, if any.
    /// Always within `[0, 1]`.
    pub fn completeness(&self) -> Option<f64> {
        *self.inner.completeness.lock()
    }

    pub fn can_be_paused(&self) -> bool {
        self.inner.task.can_be_paused()
    }

    pub fn can_be_stopped(&self) -> bool {
        self.inner.task.can_be_stopped()
    }

    pub fn supports_status_tracking(&self) -> bool {
        self.inner.task.supports_status_tracking()
    }

    pub fn supports_completeness_tracking(&self) -> bool {
        self.inner.task.supports_completeness_tracking()
    }

    pub fn add_listener(&self, listener: Arc<dyn ExecutionListener>) {
        self.inner.listeners.lock().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ExecutionListener>) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.len();
        listeners.retain(|candidate| !Arc::ptr_eq(candidate, listener));
        listeners.len() != before
    }

    /// Request a cooperative pause.
    ///
    /// Fails with [`Error::Unsupported`] when the task does not declare
    /// pause support, and with [`Error::IllegalState`] when the execution
    /// is already stopping or terminated. Pausing a paused execution is a
    /// no-op.
    pub fn pause(&self) -> Result<()> {
        if !self.inner.task.can_be_paused() {
            return Err(Error::Unsupported("task does not support pausing".into()));
        }
        {
            let mut state = self.inner.state.lock();
            match *state {
                ExecutorState::Created | ExecutorState::Running => {
                    *state = ExecutorState::Paused;
                }
                ExecutorState::Paused => return Ok(()),
                ExecutorState::Stopping | ExecutorState::Terminated => {
                    return Err(Error::IllegalState(
                        "cannot pause an execution that is stopping or terminated".into(),
                    ));
                }
            }
        }
        self.inner.pause.request();
        tracing::debug!(executor_id = %self.id(), "execution pausing");
        self.notify_execution(|listener, ex| listener.execution_pausing(ex));
        Ok(())
    }

    /// Release a pending pause. A no-op unless the execution is paused.
    pub fn resume(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state != ExecutorState::Paused {
                return;
            }
            *state = ExecutorState::Running;
        }
        self.inner.pause.release();
        tracing::debug!(executor_id = %self.id(), "execution resuming");
        self.notify_execution(|listener, ex| listener.execution_resuming(ex));
    }

    /// Request a cooperative stop and wait until the worker has exited.
    ///
    /// Fails with [`Error::Unsupported`] when the task does not declare
    /// stop support. Stopping is irrevocable; repeated calls just wait for
    /// termination again.
    pub async fn stop(&self) -> Result<()> {
        if !self.inner.task.can_be_stopped() {
            return Err(Error::Unsupported("task does not support stopping".into()));
        }
        self.request_stop();
        self.join().await;
        Ok(())
    }

    /// Signal a stop without waiting. The shutdown path signals every
    /// stoppable executor first and joins them all afterwards.
    pub(crate) fn request_stop(&self) {
        let newly_stopping = {
            let mut state = self.inner.state.lock();
            match *state {
                ExecutorState::Stopping | ExecutorState::Terminated => false,
                _ => {
                    *state = ExecutorState::Stopping;
                    true
                }
            }
        };
        if newly_stopping {
            self.inner.stop.stop();
            // A paused worker must wake to observe the stop.
            self.inner.pause.interrupt();
            tracing::debug!(executor_id = %self.id(), "execution stopping");
            self.notify_execution(|listener, ex| listener.execution_stopping(ex));
        }
    }

    /// Wait until the worker has fully exited. Safe to call from any
    /// number of callers; join failures are swallowed (a panicking body
    /// has already been recorded through the failure path).
    pub async fn join(&self) {
        let handle = self.inner.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
            return;
        }
        // Another caller holds the join handle; wait on the termination flag.
        let mut rx = self.inner.terminated.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub(crate) async fn wait_while_paused(&self) {
        self.inner.pause.wait_while_paused(&self.inner.stop).await;
    }

    pub(crate) fn publish_status_message(&self, message: String) {
        *self.inner.status_message.lock() = Some(message.clone());
        self.notify_execution(|listener, ex| listener.status_message_changed(ex, &message));
    }

    pub(crate) fn publish_completeness(&self, value: f64) {
        let clamped = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };
        *self.inner.completeness.lock() = Some(clamped);
        self.notify_execution(|listener, ex| listener.completeness_value_changed(ex, clamped));
    }

    fn set_state(&self, next: ExecutorState) {
        let mut state = self.inner.state.lock();
        if state.is_terminal() {
            return;
        }
        // A pause or stop requested before the worker got scheduled must
        // not be overwritten by the worker's initial Running transition.
        if next == ExecutorState::Running
            && matches!(*state, ExecutorState::Paused | ExecutorState::Stopping)
        {
            return;
        }
        *state = next;
    }

    /// Invoke `f` for every scheduler listener; returns whether any listener
    /// was registered. The list is snapshotted first so user callbacks run
    /// outside the lock.
    fn notify_scheduler(&self, f: impl Fn(&dyn SchedulerListener, &TaskExecutor)) -> bool {
        let listeners: Vec<_> = self.inner.scheduler_listeners.lock().clone();
        for listener in &listeners {
            f(listener.as_ref(), self);
        }
        !listeners.is_empty()
    }

    fn notify_execution(&self, f: impl Fn(&dyn ExecutionListener, &TaskExecutor)) {
        let listeners: Vec<_> = self.inner.listeners.lock().clone();
        for listener in &listeners {
            f(listener.as_ref(), self);
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

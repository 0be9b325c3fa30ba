//! The scheduler: source and listener registries, worker lifecycle, and
//! the public scheduling API.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crontide_pattern::SchedulingPattern;

use crate::error::{Error, Result};
use crate::executor::{ExecutorRegistry, SharedSchedulerListeners, TaskExecutor};
use crate::launcher::{self, LauncherHandle};
use crate::listener::SchedulerListener;
use crate::source::{MemoryTaskSource, TaskSource};
use crate::task::Task;
use crate::timer::{self, TimerHandle};

/// Mutable run state: the started flag, the configured offset, and the
/// daemon flag share this one lock.
struct Flags {
    started: bool,
    timezone_offset: Option<FixedOffset>,
    daemon: bool,
    timer: Option<TimerHandle>,
}

pub(crate) struct SchedulerCore {
    id: Uuid,
    memory: Arc<MemoryTaskSource>,
    sources: Mutex<Vec<Arc<dyn TaskSource>>>,
    listeners: SharedSchedulerListeners,
    launchers: Mutex<HashMap<Uuid, LauncherHandle>>,
    executors: ExecutorRegistry,
    flags: Mutex<Flags>,
    /// Serializes start and stop so concurrent callers race safely.
    op_lock: tokio::sync::Mutex<()>,
}

impl SchedulerCore {
    fn new(timezone_offset: Option<FixedOffset>, daemon: bool) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            memory: Arc::new(MemoryTaskSource::default()),
            sources: Mutex::new(Vec::new()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            launchers: Mutex::new(HashMap::new()),
            executors: Arc::new(Mutex::new(HashMap::new())),
            flags: Mutex::new(Flags {
                started: false,
                timezone_offset,
                daemon,
                timer: None,
            }),
            op_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn memory(&self) -> &MemoryTaskSource {
        &self.memory
    }

    pub(crate) fn executors(&self) -> &ExecutorRegistry {
        &self.executors
    }

    pub(crate) fn add_source(&self, source: Arc<dyn TaskSource>) {
        self.sources.lock().push(source);
    }

    /// The in-memory source first, then external sources in registration
    /// order.
    pub(crate) fn snapshot_sources(&self) -> Vec<Arc<dyn TaskSource>> {
        let mut snapshot: Vec<Arc<dyn TaskSource>> = vec![self.memory.clone()];
        snapshot.extend(self.sources.lock().iter().cloned());
        snapshot
    }

    pub(crate) fn spawn_executor(&self, task: Arc<dyn Task>) -> TaskExecutor {
        TaskExecutor::spawn(task, self.listeners.clone(), self.executors.clone())
    }

    /// Spawn the launcher for one tick. The tick is adjusted by the
    /// configured offset before matching.
    pub(crate) fn spawn_launcher(self: &Arc<Self>, tick: DateTime<Utc>) {
        let local = match self.flags.lock().timezone_offset {
            Some(offset) => tick.with_timezone(&offset).naive_local(),
            None => tick.naive_utc(),
        };
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        self.launchers.lock().insert(
            id,
            LauncherHandle {
                token: token.clone(),
                handle: None,
            },
        );
        let handle = tokio::spawn(launcher::run(self.clone(), id, local, token));
        if let Some(entry) = self.launchers.lock().get_mut(&id) {
            entry.handle = Some(handle);
        }
    }

    pub(crate) fn remove_launcher(&self, id: Uuid) {
        self.launchers.lock().remove(&id);
    }

    #[cfg(test)]
    pub(crate) fn new_for_tests() -> Arc<Self> {
        Self::new(None, false)
    }
}

/// A cron-style scheduler.
///
/// Registered (pattern, task) pairs are evaluated at every whole-minute
/// tick while the scheduler is started; matching tasks run as independent
/// concurrent executions. Cloning the handle is cheap and every clone
/// drives the same scheduler.
///
/// ```no_run
/// use std::sync::Arc;
/// use crontide_scheduler::{FnTask, Scheduler};
///
/// # async fn demo() -> crontide_scheduler::Result<()> {
/// let scheduler = Scheduler::new();
/// scheduler.schedule("*/5 * * * *", Arc::new(FnTask::new(|_ctx| async {
///     tracing::info!("five more minutes");
///     Ok(())
/// })))?;
/// scheduler.start().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Scheduler {
    core: Arc<SchedulerCore>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// A scheduler with default configuration: no offset (UTC matching),
    /// daemon off.
    pub fn new() -> Self {
        Self::with_config(None, false)
    }

    pub(crate) fn with_config(timezone_offset: Option<FixedOffset>, daemon: bool) -> Self {
        Self {
            core: SchedulerCore::new(timezone_offset, daemon),
        }
    }

    /// Builder-style construction; see [`SchedulerBuilder`].
    ///
    /// [`SchedulerBuilder`]: crate::SchedulerBuilder
    pub fn builder() -> crate::builder::SchedulerBuilder {
        crate::builder::SchedulerBuilder::new()
    }

    /// Opaque identity of this scheduler instance.
    pub fn id(&self) -> Uuid {
        self.core.id
    }

    pub fn is_started(&self) -> bool {
        self.core.flags.lock().started
    }

    /// The fixed offset patterns are evaluated in; `None` means UTC.
    pub fn timezone_offset(&self) -> Option<FixedOffset> {
        self.core.flags.lock().timezone_offset
    }

    /// Change the evaluation offset. Fails once the scheduler is started.
    pub fn set_timezone_offset(&self, offset: Option<FixedOffset>) -> Result<()> {
        let mut flags = self.core.flags.lock();
        if flags.started {
            return Err(Error::IllegalState(
                "cannot change the timezone offset while started".into(),
            ));
        }
        flags.timezone_offset = offset;
        Ok(())
    }

    pub fn is_daemon(&self) -> bool {
        self.core.flags.lock().daemon
    }

    /// Mark workers as daemon-style. Configuration surface only; fails
    /// once the scheduler is started.
    pub fn set_daemon(&self, daemon: bool) -> Result<()> {
        let mut flags = self.core.flags.lock();
        if flags.started {
            return Err(Error::IllegalState(
                "cannot change the daemon flag while started".into(),
            ));
        }
        flags.daemon = daemon;
        Ok(())
    }

    /// Register a task under a pattern. Returns the id used by
    /// [`Scheduler::reschedule`] and [`Scheduler::deschedule`]. May be
    /// called before or after start.
    pub fn schedule(&self, pattern: &str, task: Arc<dyn Task>) -> Result<Uuid> {
        let pattern = SchedulingPattern::parse(pattern)?;
        let id = self.core.memory.add(pattern, task);
        tracing::debug!(scheduler_id = %self.core.id, task_id = %id, "task scheduled");
        Ok(id)
    }

    /// Replace the pattern of a scheduled task. The change is atomic with
    /// respect to launcher snapshots.
    pub fn reschedule(&self, id: Uuid, pattern: &str) -> Result<()> {
        let pattern = SchedulingPattern::parse(pattern)?;
        if self.core.memory.update_pattern(id, pattern) {
            Ok(())
        } else {
            Err(Error::IllegalState(format!("no scheduled task with id {id}")))
        }
    }

    /// Remove a scheduled task. Returns whether the id was known. Running
    /// executions are unaffected.
    pub fn deschedule(&self, id: Uuid) -> bool {
        self.core.memory.remove(id)
    }

    pub fn get_task(&self, id: Uuid) -> Option<Arc<dyn Task>> {
        self.core.memory.task(id)
    }

    pub fn get_pattern(&self, id: Uuid) -> Option<SchedulingPattern> {
        self.core.memory.pattern(id)
    }

    /// Register an external source, queried once per tick after the
    /// in-memory source.
    pub fn add_task_source(&self, source: Arc<dyn TaskSource>) {
        self.core.sources.lock().push(source);
    }

    /// Remove a source by pointer identity.
    pub fn remove_task_source(&self, source: &Arc<dyn TaskSource>) -> bool {
        let mut sources = self.core.sources.lock();
        let before = sources.len();
        sources.retain(|candidate| !Arc::ptr_eq(candidate, source));
        sources.len() != before
    }

    pub fn add_listener(&self, listener: Arc<dyn SchedulerListener>) {
        self.core.listeners.lock().push(listener);
    }

    /// Remove a listener by pointer identity.
    pub fn remove_listener(&self, listener: &Arc<dyn SchedulerListener>) -> bool {
        let mut listeners = self.core.listeners.lock();
        let before = listeners.len();
        listeners.retain(|candidate| !Arc::ptr_eq(candidate, listener));
        listeners.len() != before
    }

    /// Executors that are currently alive, in no particular order.
    pub fn executing_tasks(&self) -> Vec<TaskExecutor> {
        self.core.executors.lock().values().cloned().collect()
    }

    /// Execute a task immediately, outside any pattern. Fails with
    /// [`Error::IllegalState`] when the scheduler is not started.
    pub fn launch(&self, task: Arc<dyn Task>) -> Result<TaskExecutor> {
        if !self.is_started() {
            return Err(Error::IllegalState("scheduler is not started".into()));
        }
        Ok(self.core.spawn_executor(task))
    }

    /// Start the timer loop. Fails with [`Error::IllegalState`] when
    /// already started.
    pub async fn start(&self) -> Result<()> {
        let _op = self.core.op_lock.lock().await;
        {
            let mut flags = self.core.flags.lock();
            if flags.started {
                return Err(Error::IllegalState("scheduler already started".into()));
            }
            // Fresh bookkeeping for this run.
            self.core.launchers.lock().clear();
            self.core.executors.lock().clear();

            let token = CancellationToken::new();
            let handle = tokio::spawn(timer::run(self.core.clone(), token.clone()));
            flags.timer = Some(TimerHandle { token, handle });
            flags.started = true;
        }
        tracing::info!(scheduler_id = %self.core.id, "scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for every worker to exit: the timer is
    /// cancelled and joined, then every live launcher, then every live
    /// executor (stoppable ones get a stop request; all are awaited).
    /// Fails with [`Error::IllegalState`] when not started.
    pub async fn stop(&self) -> Result<()> {
        let _op = self.core.op_lock.lock().await;
        let timer = {
            let mut flags = self.core.flags.lock();
            if !flags.started {
                return Err(Error::IllegalState("scheduler is not started".into()));
            }
            flags.started = false;
            flags.timer.take()
        };

        if let Some(TimerHandle { token, handle }) = timer {
            token.cancel();
            let _ = handle.await;
        }

        let launchers: Vec<LauncherHandle> = {
            let mut launchers = self.core.launchers.lock();
            launchers.drain().map(|(_, handle)| handle).collect()
        };
        for launcher in &launchers {
            launcher.token.cancel();
        }
        let _ = join_all(launchers.into_iter().filter_map(|l| l.handle)).await;

        // Drain executors until none are left; a straggler launched while
        // the stop was entering is picked up by the next pass.
        loop {
            let executors: Vec<TaskExecutor> = {
                self.core.executors.lock().values().cloned().collect()
            };
            if executors.is_empty() {
                break;
            }
            for executor in &executors {
                if executor.can_be_stopped() {
                    executor.request_stop();
                }
            }
            join_all(executors.iter().map(|executor| executor.join())).await;
        }

        tracing::info!(scheduler_id = %self.core.id, "scheduler stopped");
        Ok(())
    }
}

//! The task capability contract.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::Result;

/// A unit of schedulable work.
///
/// Implementations are owned by the caller; the scheduler only invokes this
/// contract. The capability methods declare which control operations the
/// body actually honors. They all default to `false`: a task that polls the
/// context's pause or stop signals should override the matching capability,
/// otherwise callers are refused the operation up front.
#[async_trait]
pub trait Task: Send + Sync {
    /// Run the task body. Errors are captured by the executor and reported
    /// through listener notifications; they never reach the spawner.
    async fn execute(&self, ctx: &ExecutionContext) -> Result<()>;

    /// The body polls [`ExecutionContext::pause_if_requested`] at safe points.
    fn can_be_paused(&self) -> bool {
        false
    }

    /// The body polls [`ExecutionContext::is_stopped`] and unwinds when set.
    fn can_be_stopped(&self) -> bool {
        false
    }

    /// The body publishes status messages through the context.
    fn supports_status_tracking(&self) -> bool {
        false
    }

    /// The body publishes completeness values through the context.
    fn supports_completeness_tracking(&self) -> bool {
        false
    }
}

type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Adapter turning an async closure into a [`Task`].
///
/// ```no_run
/// use crontide_scheduler::FnTask;
///
/// let task = FnTask::new(|_ctx| async {
///     tracing::info!("tick");
///     Ok(())
/// });
/// ```
pub struct FnTask {
    body: Box<dyn Fn(ExecutionContext) -> TaskFuture + Send + Sync>,
    pausable: bool,
    stoppable: bool,
}

impl FnTask {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            body: Box::new(move |ctx| Box::pin(body(ctx))),
            pausable: false,
            stoppable: false,
        }
    }

    /// Declare that the closure polls `pause_if_requested`.
    pub fn pausable(mut self) -> Self {
        self.pausable = true;
        self
    }

    /// Declare that the closure polls `is_stopped`.
    pub fn stoppable(mut self) -> Self {
        self.stoppable = true;
        self
    }
}

#[async_trait]
impl Task for FnTask {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<()> {
        (self.body)(ctx.clone()).await
    }

    fn can_be_paused(&self) -> bool {
        self.pausable
    }

    fn can_be_stopped(&self) -> bool {
        self.stoppable
    }
}

//! Schedule a heartbeat every minute and run for five minutes.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example heartbeat
//! ```

use std::sync::Arc;
use std::time::Duration;

use crontide_scheduler::{FnTask, Scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let scheduler = Scheduler::new();
    let id = scheduler.schedule(
        "* * * * *",
        Arc::new(FnTask::new(|_ctx| async {
            tracing::info!("heartbeat");
            Ok(())
        })),
    )?;
    tracing::info!(task_id = %id, "heartbeat scheduled");

    scheduler.start().await?;
    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    scheduler.stop().await?;

    Ok(())
}

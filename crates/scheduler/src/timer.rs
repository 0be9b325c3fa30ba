//! The scheduler heartbeat: wakes at every whole-minute boundary.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::scheduler::SchedulerCore;

pub(crate) struct TimerHandle {
    pub(crate) token: CancellationToken,
    pub(crate) handle: JoinHandle<()>,
}

/// First whole minute strictly after `now`.
pub(crate) fn next_minute_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = now
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    truncated + Duration::minutes(1)
}

/// Long-lived loop: sleep toward the next minute boundary, then ask the
/// scheduler for a launcher stamped with that boundary. Terminates only on
/// cancellation.
pub(crate) async fn run(core: Arc<SchedulerCore>, token: CancellationToken) {
    tracing::debug!(scheduler_id = %core.id(), "timer loop started");
    let mut next = next_minute_boundary(Utc::now());
    loop {
        // Sleep in a re-checking loop: after every wake the remaining time
        // is recomputed, so an early wake re-sleeps instead of firing short.
        loop {
            let remaining = next - Utc::now();
            if remaining <= Duration::zero() {
                break;
            }
            let nap = remaining
                .to_std()
                .unwrap_or(std::time::Duration::from_millis(1));
            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = token.cancelled() => {
                    tracing::debug!(scheduler_id = %core.id(), "timer loop cancelled");
                    return;
                }
            }
        }
        if token.is_cancelled() {
            tracing::debug!(scheduler_id = %core.id(), "timer loop cancelled");
            return;
        }
        tracing::debug!(scheduler_id = %core.id(), tick = %next, "minute boundary reached");
        core.spawn_launcher(next);
        next = next_minute_boundary(Utc::now());
    }
}

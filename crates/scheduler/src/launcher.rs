//! Per-tick launchers: match every source's table against the tick and
//! spawn an executor for each hit.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::scheduler::SchedulerCore;

pub(crate) struct LauncherHandle {
    pub(crate) token: CancellationToken,
    pub(crate) handle: Option<JoinHandle<()>>,
}

/// One tick's evaluation pass.
///
/// Sources are snapshotted once and walked in registration order, each
/// through a fresh table, so executors spawn in a deterministic order
/// within the tick. The cancellation token is honored between pairs; on
/// completion the launcher removes itself from the live set.
pub(crate) async fn run(
    core: Arc<SchedulerCore>,
    id: Uuid,
    tick: NaiveDateTime,
    token: CancellationToken,
) {
    let sources = core.snapshot_sources();
    let mut launched = 0usize;

    'sources: for source in sources {
        let table = source.task_table();
        for (pattern, task) in table.pairs() {
            if token.is_cancelled() {
                break 'sources;
            }
            if pattern.matches(&tick) {
                core.spawn_executor(task.clone());
                launched += 1;
            }
        }
    }

    tracing::debug!(launcher_id = %id, %tick, launched, "tick evaluation complete");
    core.remove_launcher(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{TaskSource, TaskTable};
    use crate::task::{FnTask, Task};
    use chrono::NaiveDate;
    use crontide_pattern::SchedulingPattern;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn tick(h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn marker_task(log: Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Arc<dyn Task> {
        Arc::new(FnTask::new(move |_ctx| {
            let log = log.clone();
            async move {
                log.lock().push(name);
                Ok(())
            }
        }))
    }

    struct StaticSource {
        pairs: Vec<(&'static str, Arc<dyn Task>)>,
    }

    impl TaskSource for StaticSource {
        fn task_table(&self) -> TaskTable {
            let mut table = TaskTable::new();
            for (pattern, task) in &self.pairs {
                table.add(SchedulingPattern::parse(pattern).unwrap(), task.clone());
            }
            table
        }
    }

    async fn drain_executors(core: &Arc<SchedulerCore>) {
        let executors: Vec<_> = core.executors().lock().values().cloned().collect();
        for executor in executors {
            executor.join().await;
        }
    }

    #[tokio::test]
    async fn launches_only_matching_pairs() {
        let core = SchedulerCore::new_for_tests();
        let log = Arc::new(Mutex::new(Vec::new()));
        core.add_source(Arc::new(StaticSource {
            pairs: vec![
                ("30 9 * * *", marker_task(log.clone(), "match")),
                ("0 12 * * *", marker_task(log.clone(), "miss")),
            ],
        }));

        run(core.clone(), Uuid::new_v4(), tick(9, 30), CancellationToken::new()).await;
        drain_executors(&core).await;

        assert_eq!(log.lock().clone(), vec!["match"]);
    }

    #[tokio::test]
    async fn walks_sources_in_registration_order() {
        let core = SchedulerCore::new_for_tests();
        let log = Arc::new(Mutex::new(Vec::new()));
        core.add_source(Arc::new(StaticSource {
            pairs: vec![("* * * * *", marker_task(log.clone(), "first"))],
        }));
        core.add_source(Arc::new(StaticSource {
            pairs: vec![("* * * * *", marker_task(log.clone(), "second"))],
        }));

        run(core.clone(), Uuid::new_v4(), tick(9, 0), CancellationToken::new()).await;
        drain_executors(&core).await;

        let seen = log.lock().clone();
        assert_eq!(seen.len(), 2);
        // Executors run concurrently, but both sources must have been hit.
        assert!(seen.contains(&"first") && seen.contains(&"second"));
    }

    #[tokio::test]
    async fn cancelled_launcher_stops_spawning() {
        let core = SchedulerCore::new_for_tests();
        let log = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        token.cancel();

        core.add_source(Arc::new(StaticSource {
            pairs: vec![("* * * * *", marker_task(log.clone(), "never"))],
        }));

        run(core.clone(), Uuid::new_v4(), tick(9, 0), token).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(log.lock().is_empty());
        assert!(core.executors().lock().is_empty());
    }

    #[tokio::test]
    async fn memory_source_is_evaluated_first() {
        let core = SchedulerCore::new_for_tests();
        let log = Arc::new(Mutex::new(Vec::new()));
        core.memory().add(
            SchedulingPattern::parse("* * * * *").unwrap(),
            marker_task(log.clone(), "memory"),
        );

        run(core.clone(), Uuid::new_v4(), tick(10, 0), CancellationToken::new()).await;
        drain_executors(&core).await;

        assert_eq!(log.lock().clone(), vec!["memory"]);
    }
}

//! Construction-time scheduler configuration.

use chrono::FixedOffset;

use crate::scheduler::Scheduler;

/// Builder for [`Scheduler`].
///
/// Both knobs can also be changed later through the scheduler's setters,
/// up until `start()`.
#[derive(Debug, Default, Clone)]
pub struct SchedulerBuilder {
    timezone_offset: Option<FixedOffset>,
    daemon: bool,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate patterns in the given fixed UTC offset instead of UTC.
    pub fn timezone_offset(mut self, offset: FixedOffset) -> Self {
        self.timezone_offset = Some(offset);
        self
    }

    /// Mark workers as daemon-style.
    pub fn daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    pub fn build(self) -> Scheduler {
        Scheduler::with_config(self.timezone_offset, self.daemon)
    }
}

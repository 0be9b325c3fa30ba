//! Forward prediction of the next matching minute.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::pattern::{is_leap_year, MatcherGroup, SchedulingPattern};

/// Bound on the per-group forward search, in years past the cursor.
///
/// The rarest satisfiable constraint the grammar can express is Feb 29
/// pinned to a single weekday; gaps there stay under five decades even
/// across skipped century leap years. Anything unsatisfied beyond this
/// horizon is treated as never matching.
const HORIZON_YEARS: i32 = 50;

/// Computes successive matching minutes for a pattern.
///
/// Stateful: every call to [`Predictor::next_matching_date`] advances the
/// internal cursor, so repeated calls yield a strictly increasing,
/// minute-granular sequence.
pub struct Predictor {
    pattern: SchedulingPattern,
    cursor: NaiveDateTime,
}

impl Predictor {
    /// Start predicting from `start` (seconds are truncated; the first
    /// result is strictly later than `start`'s minute).
    pub fn new(pattern: SchedulingPattern, start: NaiveDateTime) -> Self {
        Self {
            pattern,
            cursor: truncate_to_minute(start),
        }
    }

    /// Start predicting from a UTC instant.
    pub fn from_utc(pattern: SchedulingPattern, start: DateTime<Utc>) -> Self {
        Self::new(pattern, start.naive_utc())
    }

    pub fn pattern(&self) -> &SchedulingPattern {
        &self.pattern
    }

    /// The next strictly later matching minute, or `None` when no match
    /// exists within the search horizon.
    pub fn next_matching_date(&mut self) -> Option<NaiveDateTime> {
        let from = self.cursor + Duration::minutes(1);
        let horizon_year = from.year() + HORIZON_YEARS;
        let next = self
            .pattern
            .groups()
            .iter()
            .filter_map(|group| next_for_group(group, from, horizon_year))
            .min()?;
        self.cursor = next;
        Some(next)
    }
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Coarse-to-fine search: at the first rejecting field, advance by the
/// smallest step that can change the verdict and reset all finer fields.
/// The skip is always minimal for the rejecting field, so no matching
/// minute is ever jumped over.
fn next_for_group(
    group: &MatcherGroup,
    from: NaiveDateTime,
    horizon_year: i32,
) -> Option<NaiveDateTime> {
    let mut at = from;
    loop {
        if at.year() > horizon_year {
            return None;
        }
        if !group.month.matches(at.month()) {
            at = first_minute_of_next_month(&at)?;
            continue;
        }
        let leap = is_leap_year(at.year());
        if !group.day_of_month.matches_day(at.day(), at.month(), leap)
            || !group.day_of_week.matches(at.weekday().num_days_from_sunday())
        {
            at = next_midnight(&at)?;
            continue;
        }
        if !group.hour.matches(at.hour()) {
            at = next_hour(&at);
            continue;
        }
        if !group.minute.matches(at.minute()) {
            at = at + Duration::minutes(1);
            continue;
        }
        return Some(at);
    }
}

fn first_minute_of_next_month(at: &NaiveDateTime) -> Option<NaiveDateTime> {
    let (year, month) = if at.month() == 12 {
        (at.year() + 1, 1)
    } else {
        (at.year(), at.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

fn next_midnight(at: &NaiveDateTime) -> Option<NaiveDateTime> {
    at.date().checked_add_days(Days::new(1))?.and_hms_opt(0, 0, 0)
}

fn next_hour(at: &NaiveDateTime) -> NaiveDateTime {
    at.with_minute(0).unwrap_or(*at) + Duration::hours(1)
}

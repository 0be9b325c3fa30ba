//! Scheduling patterns: `|`-separated alternatives of five matchers each.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PatternError, Result};
use crate::matcher::ValueMatcher;
use crate::parse::{parse_field, DAY_OF_MONTH, DAY_OF_WEEK, HOUR, MINUTE, MONTH};

pub(crate) fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// One alternative rule set: exactly five matchers, one per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherGroup {
    pub minute: ValueMatcher,
    pub hour: ValueMatcher,
    pub day_of_month: ValueMatcher,
    pub month: ValueMatcher,
    pub day_of_week: ValueMatcher,
}

impl MatcherGroup {
    fn parse(text: &str, group: usize) -> Result<Self> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(PatternError::FieldCount {
                group,
                count: fields.len(),
            });
        }
        Ok(Self {
            minute: parse_field(fields[0], &MINUTE, group)?,
            hour: parse_field(fields[1], &HOUR, group)?,
            day_of_month: parse_field(fields[2], &DAY_OF_MONTH, group)?,
            month: parse_field(fields[3], &MONTH, group)?,
            day_of_week: parse_field(fields[4], &DAY_OF_WEEK, group)?,
        })
    }

    /// True when all five matchers accept the moment's fields.
    pub fn matches(&self, at: &NaiveDateTime) -> bool {
        self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self
                .day_of_month
                .matches_day(at.day(), at.month(), is_leap_year(at.year()))
            && self.month.matches(at.month())
            && self
                .day_of_week
                .matches(at.weekday().num_days_from_sunday())
    }
}

/// A parsed scheduling pattern: one or more alternative matcher groups.
///
/// A moment matches when any group's five matchers all accept its minute,
/// hour, day-of-month, month, and day-of-week. Matching is second-blind;
/// callers evaluate whole minutes.
///
/// The original text is retained; `Display` and serde round-trip through
/// it, so a serialized pattern re-parses to the same accept sets.
#[derive(Debug, Clone)]
pub struct SchedulingPattern {
    source: String,
    groups: Vec<MatcherGroup>,
}

impl SchedulingPattern {
    /// Parse pattern text. Fails with [`PatternError`] naming the offending
    /// group and field.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PatternError::Empty);
        }
        let mut groups = Vec::new();
        for (index, alternative) in trimmed.split('|').enumerate() {
            let group = index + 1;
            if alternative.trim().is_empty() {
                return Err(PatternError::EmptyGroup { group });
            }
            groups.push(MatcherGroup::parse(alternative, group)?);
        }
        Ok(Self {
            source: trimmed.to_string(),
            groups,
        })
    }

    /// Check pattern text without keeping the result.
    pub fn validate(text: &str) -> Result<()> {
        Self::parse(text).map(|_| ())
    }

    /// Match against a naive local datetime (already adjusted to whatever
    /// offset the caller schedules in).
    pub fn matches(&self, at: &NaiveDateTime) -> bool {
        self.groups.iter().any(|group| group.matches(at))
    }

    /// Convenience: match a UTC instant with no offset adjustment.
    pub fn matches_utc(&self, at: &DateTime<Utc>) -> bool {
        self.matches(&at.naive_utc())
    }

    pub fn groups(&self) -> &[MatcherGroup] {
        &self.groups
    }

    /// The canonical text this pattern was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for SchedulingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for SchedulingPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for SchedulingPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for SchedulingPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn wildcard_matches_every_minute() {
        let p = SchedulingPattern::parse("* * * * *").unwrap();
        assert!(p.matches(&at(2024, 6, 15, 0, 0)));
        assert!(p.matches(&at(2024, 6, 15, 23, 59)));
        assert!(p.matches(&at(2025, 1, 1, 12, 30)));
    }

    #[test]
    fn exact_moment() {
        let p = SchedulingPattern::parse("0 12 1 1 *").unwrap();
        assert!(p.matches(&at(2024, 1, 1, 12, 0)));
        assert!(!p.matches(&at(2024, 1, 1, 12, 1)));
        assert!(!p.matches(&at(2024, 1, 1, 11, 0)));
        assert!(!p.matches(&at(2024, 1, 2, 12, 0)));
        assert!(!p.matches(&at(2024, 2, 1, 12, 0)));
    }

    #[test]
    fn step_and_range_fields() {
        let p = SchedulingPattern::parse("*/15 9-17 * * *").unwrap();
        for minute in [0, 15, 30, 45] {
            assert!(p.matches(&at(2024, 6, 15, 9, minute)));
            assert!(p.matches(&at(2024, 6, 15, 17, minute)));
        }
        assert!(!p.matches(&at(2024, 6, 15, 9, 10)));
        assert!(!p.matches(&at(2024, 6, 15, 8, 0)));
        assert!(!p.matches(&at(2024, 6, 15, 18, 0)));
    }

    #[test]
    fn last_day_of_month_rule() {
        let p = SchedulingPattern::parse("0 0 L * *").unwrap();
        // Leap year: Feb 29 is the last day, Feb 28 is not.
        assert!(p.matches(&at(2024, 2, 29, 0, 0)));
        assert!(!p.matches(&at(2024, 2, 28, 0, 0)));
        // Common year: Feb 28 is the last day.
        assert!(p.matches(&at(2023, 2, 28, 0, 0)));
        assert!(p.matches(&at(2024, 1, 31, 0, 0)));
        assert!(p.matches(&at(2024, 4, 30, 0, 0)));
        assert!(!p.matches(&at(2024, 4, 29, 0, 0)));
        // Century rule: 1900 was not a leap year, 2000 was.
        assert!(p.matches(&at(1900, 2, 28, 0, 0)));
        assert!(p.matches(&at(2000, 2, 29, 0, 0)));
        assert!(!p.matches(&at(2000, 2, 28, 0, 0)));
    }

    #[test]
    fn weekday_field() {
        // 2024-06-16 is a Sunday.
        let p = SchedulingPattern::parse("0 9 * * sun").unwrap();
        assert!(p.matches(&at(2024, 6, 16, 9, 0)));
        assert!(!p.matches(&at(2024, 6, 17, 9, 0)));

        let folded = SchedulingPattern::parse("0 9 * * 7").unwrap();
        assert!(folded.matches(&at(2024, 6, 16, 9, 0)));
    }

    #[test]
    fn day_of_month_and_week_must_both_match() {
        // 2024-06-16 is a Sunday, 2024-06-17 a Monday.
        let p = SchedulingPattern::parse("0 9 16 * mon").unwrap();
        assert!(!p.matches(&at(2024, 6, 16, 9, 0)));
        assert!(!p.matches(&at(2024, 6, 17, 9, 0)));
        // 2024-09-16 is a Monday: both constraints hold.
        assert!(p.matches(&at(2024, 9, 16, 9, 0)));
    }

    #[test]
    fn alternative_groups_are_or_ed() {
        let p = SchedulingPattern::parse("0 8 * * *|30 17 * * *").unwrap();
        assert!(p.matches(&at(2024, 6, 15, 8, 0)));
        assert!(p.matches(&at(2024, 6, 15, 17, 30)));
        assert!(!p.matches(&at(2024, 6, 15, 8, 30)));
        assert!(!p.matches(&at(2024, 6, 15, 17, 0)));
        assert_eq!(p.groups().len(), 2);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            SchedulingPattern::parse("").unwrap_err(),
            PatternError::Empty
        );
        assert_eq!(
            SchedulingPattern::parse("* * * *").unwrap_err(),
            PatternError::FieldCount { group: 1, count: 4 }
        );
        assert_eq!(
            SchedulingPattern::parse("* * * * * *").unwrap_err(),
            PatternError::FieldCount { group: 1, count: 6 }
        );
        assert_eq!(
            SchedulingPattern::parse("* * * * *|").unwrap_err(),
            PatternError::EmptyGroup { group: 2 }
        );
        // The failing alternative is named, not the first one.
        assert_eq!(
            SchedulingPattern::parse("* * * * *|61 * * * *").unwrap_err(),
            PatternError::Field {
                group: 2,
                field: "minute",
                message: "value 61 out of range 0..=59".into(),
            }
        );
    }

    #[test]
    fn display_round_trips_to_identical_accept_sets() {
        let texts = [
            "* * * * *",
            "*/15 9-17 * * *",
            "0 0 L * *",
            "0,30 22-2 1,15,L jan-mar,dec fri-mon",
            "0 8 * * mon|30 17 * * fri|*/5 * * * sat,sun",
        ];
        for text in texts {
            let parsed = SchedulingPattern::parse(text).unwrap();
            let reparsed: SchedulingPattern = parsed.to_string().parse().unwrap();
            assert_eq!(parsed.groups(), reparsed.groups(), "pattern {text}");
        }
    }

    #[test]
    fn serde_as_string() {
        let p = SchedulingPattern::parse("*/5 * * * *").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"*/5 * * * *\"");
        let back: SchedulingPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(p.groups(), back.groups());
        assert!(serde_json::from_str::<SchedulingPattern>("\"not a pattern\"").is_err());
    }

    #[test]
    fn matches_utc_convenience() {
        use chrono::TimeZone;
        let p = SchedulingPattern::parse("30 9 * * *").unwrap();
        let t = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        assert!(p.matches_utc(&t));
    }
}

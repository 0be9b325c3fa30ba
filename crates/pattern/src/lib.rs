//! Cron-style scheduling patterns: parsing, matching, and prediction.
//!
//! A pattern is one or more `|`-separated alternatives, each with five
//! whitespace-separated fields (minute, hour, day-of-month, month,
//! day-of-week). Fields support `*`, comma lists, `a-b` ranges (wrapping
//! when a > b), `/step` decimation, 3-letter month and weekday aliases,
//! and `L` for the last day of the month. A moment matches when any
//! alternative accepts all five of its fields.
//!
//! - [`SchedulingPattern`]: parse and match.
//! - [`Predictor`]: compute successive future matching minutes.

mod error;
mod matcher;
mod parse;
mod pattern;
mod predictor;

pub use error::{PatternError, Result};
pub use matcher::ValueMatcher;
pub use pattern::{MatcherGroup, SchedulingPattern};
pub use predictor::Predictor;

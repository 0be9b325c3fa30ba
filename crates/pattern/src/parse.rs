//! Field-level pattern parsing: lists, ranges, steps, and aliases.

use crate::error::{PatternError, Result};
use crate::matcher::{ValueMatcher, LAST_DAY};

/// Static description of one of the five pattern fields.
pub(crate) struct FieldSpec {
    pub name: &'static str,
    pub min: u32,
    pub max: u32,
    /// 3-letter names accepted in place of numbers; the alias at position
    /// `i` stands for the value `min + i`.
    pub aliases: &'static [&'static str],
    /// Day-of-month only: accept `L` as the last-day sentinel.
    pub allow_last_day: bool,
    /// Day-of-week only: fold 7 to 0 after expansion.
    pub fold_sunday: bool,
}

pub(crate) const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
    aliases: &[],
    allow_last_day: false,
    fold_sunday: false,
};

pub(crate) const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
    aliases: &[],
    allow_last_day: false,
    fold_sunday: false,
};

pub(crate) const DAY_OF_MONTH: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
    aliases: &[],
    allow_last_day: true,
    fold_sunday: false,
};

pub(crate) const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    aliases: &[
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ],
    allow_last_day: false,
    fold_sunday: false,
};

pub(crate) const DAY_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
    aliases: &["sun", "mon", "tue", "wed", "thu", "fri", "sat"],
    allow_last_day: false,
    fold_sunday: true,
};

/// Parse one whitespace-separated field into a matcher.
///
/// `group` is the 1-based alternative index, used only for error messages.
pub(crate) fn parse_field(field: &str, spec: &FieldSpec, group: usize) -> Result<ValueMatcher> {
    let field_err = |message: String| PatternError::Field {
        group,
        field: spec.name,
        message,
    };

    if field.is_empty() {
        return Err(field_err("empty field".into()));
    }
    if field == "*" {
        return Ok(ValueMatcher::Always);
    }

    let mut values: Vec<u32> = Vec::new();
    for element in field.split(',') {
        for value in parse_element(element, spec).map_err(&field_err)? {
            let value = if spec.fold_sunday { value % 7 } else { value };
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    if values.is_empty() {
        return Err(field_err("field produced no values".into()));
    }
    values.sort_unstable();

    Ok(if spec.allow_last_day {
        ValueMatcher::LastAwareSet(values)
    } else {
        ValueMatcher::Set(values)
    })
}

/// One comma-separated element: a value or range, optionally `/step`.
fn parse_element(element: &str, spec: &FieldSpec) -> std::result::Result<Vec<u32>, String> {
    let (base, step) = match element.split_once('/') {
        Some((base, step_text)) => {
            let step: u32 = step_text
                .parse()
                .map_err(|_| format!("invalid step '{step_text}': expected a positive integer"))?;
            if step == 0 {
                return Err(format!("invalid step '{step_text}': divisor must be positive"));
            }
            (base, step)
        }
        None => (element, 1),
    };

    let expanded = expand_range(base, spec)?;
    // The step keeps every step-th element of the expansion, by index.
    Ok(expanded.into_iter().step_by(step as usize).collect())
}

fn expand_range(text: &str, spec: &FieldSpec) -> std::result::Result<Vec<u32>, String> {
    if text == "*" {
        return Ok((spec.min..=spec.max).collect());
    }
    match text.split_once('-') {
        Some((start_text, end_text)) => {
            let start = parse_value(start_text, spec)?;
            let end = parse_value(end_text, spec)?;
            if start <= end {
                Ok((start..=end).collect())
            } else {
                // Wrap-around interval: start up to the field maximum, then
                // the field minimum up to end.
                Ok((start..=spec.max).chain(spec.min..=end).collect())
            }
        }
        None => Ok(vec![parse_value(text, spec)?]),
    }
}

fn parse_value(text: &str, spec: &FieldSpec) -> std::result::Result<u32, String> {
    if spec.allow_last_day && text.eq_ignore_ascii_case("l") {
        return Ok(LAST_DAY);
    }
    if let Some(pos) = spec
        .aliases
        .iter()
        .position(|alias| alias.eq_ignore_ascii_case(text))
    {
        return Ok(spec.min + pos as u32);
    }
    let value: u32 = text.parse().map_err(|_| {
        if spec.aliases.is_empty() {
            format!("invalid value '{text}'")
        } else {
            format!("unrecognized value or alias '{text}'")
        }
    })?;
    if value < spec.min || value > spec.max {
        return Err(format!(
            "value {value} out of range {}..={}",
            spec.min, spec.max
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(field: &str, spec: &FieldSpec) -> Vec<u32> {
        match parse_field(field, spec, 1).unwrap() {
            ValueMatcher::Set(v) | ValueMatcher::LastAwareSet(v) => v,
            ValueMatcher::Always => panic!("expected an explicit set"),
        }
    }

    fn err(field: &str, spec: &FieldSpec) -> String {
        parse_field(field, spec, 1).unwrap_err().to_string()
    }

    #[test]
    fn star_is_always() {
        assert_eq!(parse_field("*", &MINUTE, 1).unwrap(), ValueMatcher::Always);
    }

    #[test]
    fn single_values_and_lists() {
        assert_eq!(set("5", &MINUTE), vec![5]);
        assert_eq!(set("0,15,30,45", &MINUTE), vec![0, 15, 30, 45]);
    }

    #[test]
    fn duplicates_collapse_and_sets_sort() {
        assert_eq!(set("30,5,30,5", &MINUTE), vec![5, 30]);
        assert_eq!(set("10-12,11", &MINUTE), vec![10, 11, 12]);
    }

    #[test]
    fn plain_range() {
        assert_eq!(set("9-17", &HOUR), (9..=17).collect::<Vec<_>>());
        assert_eq!(set("3-3", &HOUR), vec![3]);
    }

    #[test]
    fn wraparound_range() {
        assert_eq!(set("22-2", &HOUR), vec![0, 1, 2, 22, 23]);
        assert_eq!(set("58-2", &MINUTE), vec![0, 1, 2, 58, 59]);
        assert_eq!(set("nov-feb", &MONTH), vec![1, 2, 11, 12]);
    }

    #[test]
    fn step_decimates_by_index() {
        assert_eq!(
            set("*/15", &MINUTE),
            vec![0, 15, 30, 45],
            "full range stepped from index zero"
        );
        assert_eq!(set("10-20/5", &MINUTE), vec![10, 15, 20]);
        // The step walks the expanded sequence, so a wrapped range steps
        // across the wrap point, not within each half.
        assert_eq!(set("50-10/4", &MINUTE), vec![2, 6, 10, 50, 54, 58]);
    }

    #[test]
    fn step_on_single_value() {
        assert_eq!(set("5/2", &MINUTE), vec![5]);
    }

    #[test]
    fn month_aliases() {
        assert_eq!(set("jan", &MONTH), vec![1]);
        assert_eq!(set("DEC", &MONTH), vec![12]);
        assert_eq!(set("mar-may", &MONTH), vec![3, 4, 5]);
        assert_eq!(set("2,feb", &MONTH), vec![2]);
    }

    #[test]
    fn weekday_aliases_and_sunday_fold() {
        assert_eq!(set("sun", &DAY_OF_WEEK), vec![0]);
        assert_eq!(set("sat", &DAY_OF_WEEK), vec![6]);
        assert_eq!(set("7", &DAY_OF_WEEK), vec![0]);
        assert_eq!(set("0,7", &DAY_OF_WEEK), vec![0]);
        assert_eq!(set("fri-mon", &DAY_OF_WEEK), vec![0, 1, 5, 6]);
    }

    #[test]
    fn last_day_sentinel() {
        assert_eq!(set("L", &DAY_OF_MONTH), vec![LAST_DAY]);
        assert_eq!(set("l", &DAY_OF_MONTH), vec![LAST_DAY]);
        assert_eq!(set("1,15,L", &DAY_OF_MONTH), vec![1, 15, LAST_DAY]);
    }

    #[test]
    fn last_day_rejected_outside_day_of_month() {
        assert!(parse_field("L", &MINUTE, 1).is_err());
        assert!(parse_field("L", &MONTH, 1).is_err());
    }

    #[test]
    fn out_of_range_values() {
        assert!(err("60", &MINUTE).contains("out of range"));
        assert!(err("24", &HOUR).contains("out of range"));
        assert!(err("0", &DAY_OF_MONTH).contains("out of range"));
        assert!(err("32", &DAY_OF_MONTH).contains("out of range"));
        assert!(err("13", &MONTH).contains("out of range"));
        assert!(err("8", &DAY_OF_WEEK).contains("out of range"));
    }

    #[test]
    fn bad_steps() {
        assert!(err("*/0", &MINUTE).contains("divisor must be positive"));
        assert!(err("*/x", &MINUTE).contains("expected a positive integer"));
        assert!(err("*/-2", &MINUTE).contains("expected a positive integer"));
    }

    #[test]
    fn bad_values() {
        assert!(err("", &MINUTE).contains("empty field"));
        assert!(err("abc", &MINUTE).contains("invalid value"));
        assert!(err("janx", &MONTH).contains("unrecognized value or alias"));
        assert!(err("1-", &MINUTE).contains("invalid value"));
    }

    #[test]
    fn errors_name_the_field() {
        let e = parse_field("61", &MINUTE, 2).unwrap_err();
        assert_eq!(
            e,
            PatternError::Field {
                group: 2,
                field: "minute",
                message: "value 61 out of range 0..=59".into(),
            }
        );
    }
}

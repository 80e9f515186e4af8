//! `age()`: how long ago a timestamp was, or how long a duration is.
//!
//! ```text
//! filter(age(.created) < age("1 days"))
//! ```
//!
//! Both sides come out as seconds, so timestamps and durations compare
//! directly.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(second|minute|hour|day|week)s?\s*$").unwrap()
});

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

/// Parses a timestamp, treating values without an offset as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Seconds in a duration such as `"1 days"` or `"90 minutes"`.
pub fn parse_duration(text: &str) -> Option<f64> {
    let captures = DURATION.captures(text)?;
    let amount: f64 = captures[1].parse().ok()?;
    let unit = match &captures[2] {
        "second" => 1.0,
        "minute" => 60.0,
        "hour" => 3_600.0,
        "day" => 86_400.0,
        "week" => 604_800.0,
        _ => return None,
    };
    Some(amount * unit)
}

/// Age of `text` in seconds relative to `now`.
pub fn age_at(text: &str, now: DateTime<Utc>) -> Option<f64> {
    if let Some(then) = parse_timestamp(text) {
        let elapsed = now.signed_duration_since(then);
        return Some(elapsed.num_milliseconds() as f64 / 1000.0);
    }
    parse_duration(text)
}

/// Age of `text` in seconds relative to the current time.
pub fn age(text: &str) -> Option<f64> {
    age_at(text, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        parse_timestamp("2018-01-31 00:00:00").unwrap()
    }

    #[test]
    fn test_offset_timestamp() {
        let utc = age_at("2018-01-30 16:06:59+00:00", now()).unwrap();
        let plus_three = age_at("2018-01-30 16:06:59+03:00", now()).unwrap();
        assert_eq!(plus_three - utc, 3.0 * 3_600.0);
    }

    #[test]
    fn test_date_only() {
        assert_eq!(age_at("2018-01-30", now()), Some(86_400.0));
    }

    #[test]
    fn test_rfc3339() {
        assert_eq!(age_at("2018-01-30T23:59:00Z", now()), Some(60.0));
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_duration("1 days"), Some(86_400.0));
        assert_eq!(parse_duration("2 hour"), Some(7_200.0));
        assert_eq!(parse_duration("1 fortnight"), None);
    }

    #[test]
    fn test_not_a_date() {
        assert_eq!(age_at("not a date", now()), None);
        assert_eq!(age_at("", now()), None);
    }
}

//! Time text values used by `FROM_TIME_TEXT` and `TO_TIME_TEXT`.
//!
//! Accepted forms, tried in order:
//!
//! - a plain number of seconds, decimal or scientific (`-5.24232e7`)
//! - a calendar time in UTC (`2021-03-04T05:06:07Z`, `2021-03-04 05:06:07.5`,
//!   `20210304T050607`), converted to seconds since the Unix epoch
//! - a duration made of `d`, `h`, `m`, `s` components in that order, each at
//!   most once, with an optional leading sign (`3d5h6m45s`, `-90s`, `1.5h`)

use crate::error::ParseError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const UNITS: [(char, f64); 4] = [('d', 86_400.0), ('h', 3_600.0), ('m', 60.0), ('s', 1.0)];

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y%m%dT%H%M%S%.f"];

/// Evaluate a time text to seconds.
pub fn parse_time_text(text: &str) -> Result<f64, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::time_text(text, "empty time text"));
    }

    if let Ok(value) = trimmed.parse::<f64>() {
        if !value.is_finite() {
            return Err(ParseError::time_text(text, "value is not finite"));
        }
        return Ok(value);
    }

    if let Some(seconds) = parse_calendar(trimmed) {
        return Ok(seconds);
    }

    parse_duration(trimmed).map_err(|reason| ParseError::time_text(text, reason))
}

fn parse_calendar(text: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(epoch_seconds(&dt.with_timezone(&Utc)));
    }
    NAIVE_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(text, format)
            .ok()
            .map(|naive| epoch_seconds(&Utc.from_utc_datetime(&naive)))
    })
}

fn epoch_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9
}

fn parse_duration(text: &str) -> Result<f64, String> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if body.is_empty() {
        return Err("missing duration components".to_string());
    }

    let mut total = 0.0;
    let mut next_rank = 0;
    let mut number = String::new();

    for c in body.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }
        let unit = c.to_ascii_lowercase();
        let Some(rank) = UNITS.iter().position(|(u, _)| *u == unit) else {
            return Err(format!("unknown unit '{c}'"));
        };
        if number.is_empty() {
            return Err(format!("unit '{c}' has no value"));
        }
        if rank < next_rank {
            return Err(format!("unit '{c}' is repeated or out of order"));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid number {number:?}"))?;
        total += value * UNITS[rank].1;
        next_rank = rank + 1;
        number.clear();
    }

    if !number.is_empty() {
        return Err(format!("number {number:?} has no unit"));
    }

    Ok(if negative { -total } else { total })
}

/// Render seconds as a duration text, e.g. `277605` -> `3d5h6m45s`.
pub fn format_duration(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let mut remaining = seconds.abs();
    let mut out = String::from(sign);

    for (unit, scale) in &UNITS[..3] {
        let whole = (remaining / scale).floor();
        if whole >= 1.0 {
            out.push_str(&format!("{whole}{unit}"));
            remaining -= whole * scale;
        }
    }
    // Round away float noise left over from the subtraction.
    let remaining = (remaining * 1e6).round() / 1e6;
    if remaining > 0.0 || out.len() == sign.len() {
        out.push_str(&format!("{remaining}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_time_text("12.5").unwrap(), 12.5);
        assert_eq!(parse_time_text("-5.24232e7").unwrap(), -52_423_200.0);
        assert_eq!(parse_time_text(" 0 ").unwrap(), 0.0);
    }

    #[test]
    fn test_duration_components() {
        assert_eq!(parse_time_text("3d5h6m45s").unwrap(), 277_605.0);
        assert_eq!(parse_time_text("90s").unwrap(), 90.0);
        assert_eq!(parse_time_text("1.5h").unwrap(), 5_400.0);
        assert_eq!(parse_time_text("-2m").unwrap(), -120.0);
        assert_eq!(parse_time_text("1h30s").unwrap(), 3_630.0);
    }

    #[test]
    fn test_duration_errors() {
        assert!(parse_time_text("").is_err());
        assert!(parse_time_text("5x").is_err());
        assert!(parse_time_text("5s3m").is_err());
        assert!(parse_time_text("1h2h").is_err());
        assert!(parse_time_text("3d5").is_err());
        assert!(parse_time_text("h").is_err());
        assert!(parse_time_text("inf").is_err());
    }

    #[test]
    fn test_calendar_times() {
        assert_eq!(parse_time_text("1970-01-02T00:00:00Z").unwrap(), 86_400.0);
        assert_eq!(parse_time_text("1970-01-01 00:01:00.5").unwrap(), 60.5);
        assert_eq!(parse_time_text("19700101T000010").unwrap(), 10.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(277_605.0), "3d5h6m45s");
        assert_eq!(format_duration(-120.0), "-2m");
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(59.99), "59.99s");
    }
}

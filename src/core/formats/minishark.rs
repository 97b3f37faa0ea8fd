//! MiniShark text export.
//!
//! Header lines start with `#` and hold `Name:<tab>value` pairs. Each data
//! row has three tab-separated integer counts: vertical, north, east.

use super::{required_header, Component, Recording};
use crate::error::{Error, ParseError};
use crate::params::types::SignalFormat;

const CHANNELS: [&str; 3] = ["V", "N", "E"];

/// Parse a MiniShark file. Counts are divided by `Gain` and
/// `Conversion factor` when the header gives them.
pub fn parse_minishark(content: &str) -> Result<Recording, Error> {
    let mut header: Vec<(String, String)> = Vec::new();
    let mut columns: [Vec<f64>; 3] = Default::default();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(field) = trimmed.strip_prefix('#') {
            if let Some((key, value)) = field.split_once(':') {
                header.push((key.trim().to_string(), value.trim().to_string()));
            }
            continue;
        }

        let malformed = || ParseError::MalformedSample {
            line: idx + 1,
            text: line.to_string(),
        };
        let values = trimmed
            .split_whitespace()
            .map(|field| field.parse::<f64>().map_err(|_| malformed()))
            .collect::<Result<Vec<f64>, _>>()?;
        if values.len() != 3 {
            return Err(malformed().into());
        }
        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    let declared: usize = required_header(&header, "Sample number")?;
    let rate: f64 = required_header(&header, "Sample rate (sps)")?;
    let actual = columns[0].len();
    if actual != declared {
        return Err(ParseError::SampleCount { declared, actual }.into());
    }

    let gain: f64 = optional_factor(&header, "Gain")?;
    let conversion: f64 = optional_factor(&header, "Conversion factor")?;
    let scale = gain * conversion;
    if scale != 1.0 {
        for column in columns.iter_mut() {
            column.iter_mut().for_each(|x| *x /= scale);
        }
    }

    let components = CHANNELS
        .into_iter()
        .zip(columns)
        .map(|(name, samples)| Component::new(name, samples))
        .collect();
    Ok(Recording::new(
        SignalFormat::MiniShark,
        1.0 / rate,
        None,
        components,
    )?)
}

/// A positive scale factor, 1 when absent.
fn optional_factor(header: &[(String, String)], key: &str) -> Result<f64, ParseError> {
    if super::header_value(header, key).is_none() {
        return Ok(1.0);
    }
    let value: f64 = required_header(header, key)?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ParseError::invalid_value(
            key,
            value.to_string(),
            "must be positive",
        ))
    }
}

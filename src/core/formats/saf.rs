//! SESAME ASCII data format (SAF).
//!
//! ```text
//! SESAME ASCII data format (saf) v. 1
//! STA_CODE = STN11
//! START_TIME = 2018 08 21 21 54 00.000
//! SAMP_FREQ = 100
//! NDAT = 3
//! CH0_ID = V
//! CH1_ID = N
//! CH2_ID = E
//! ####--------------------------------------------
//! -104 -13 -85
//! ...
//! ```

use super::{header_value, required_header, Component, Recording};
use crate::error::{Error, ParseError};
use crate::params::types::SignalFormat;
use chrono::{NaiveDateTime, TimeZone, Utc};

const DEFAULT_CHANNELS: [&str; 3] = ["V", "N", "E"];

/// Parse a SAF file. Samples are read as written; no unit conversion.
pub fn parse_saf(content: &str) -> Result<Recording, Error> {
    let mut lines = content.lines().enumerate();
    let mut header: Vec<(String, String)> = Vec::new();

    for (_, line) in lines.by_ref() {
        let line = line.trim();
        if line.starts_with("####") {
            break;
        }
        if let Some((key, value)) = line.split_once('=') {
            header.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    let declared: usize = required_header(&header, "NDAT")?;
    let fs: f64 = required_header(&header, "SAMP_FREQ")?;
    let names: Vec<String> = (0..3)
        .map(|ch| {
            header_value(&header, &format!("CH{ch}_ID"))
                .unwrap_or(DEFAULT_CHANNELS[ch])
                .to_string()
        })
        .collect();

    let mut columns: [Vec<f64>; 3] = Default::default();
    for (idx, line) in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
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

    let actual = columns[0].len();
    if actual != declared {
        return Err(ParseError::SampleCount { declared, actual }.into());
    }

    let start = header_value(&header, "START_TIME").and_then(parse_start_time);
    let components = names
        .into_iter()
        .zip(columns)
        .map(|(name, samples)| Component::new(name, samples))
        .collect();

    Ok(Recording::new(SignalFormat::Saf, 1.0 / fs, start, components)?)
}

/// `YYYY MM DD hh mm ss.sss` in UTC, as seconds since the epoch.
fn parse_start_time(text: &str) -> Option<f64> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match NaiveDateTime::parse_from_str(&normalized, "%Y %m %d %H %M %S%.f") {
        Ok(naive) => {
            let time = Utc.from_utc_datetime(&naive);
            Some(time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9)
        }
        Err(e) => {
            tracing::warn!(text, error = %e, "Ignoring unreadable SAF start time");
            None
        }
    }
}

//! PEER strong-motion record.
//!
//! ```text
//! PEER NGA STRONG MOTION DATABASE RECORD
//! Imperial Valley-06, 10/15/1979, Agrarias, UP
//! ACCELERATION TIME SERIES IN UNITS OF G
//! NPTS=  3750, DT=   .0100 SEC
//!   .2349E-03  .2390E-03  .2420E-03  .2443E-03  .2459E-03
//! ```
//!
//! The direction after the last comma of the second line names the single
//! component.

use super::{Component, Recording};
use crate::error::{Error, ParseError};
use crate::params::types::SignalFormat;

pub fn parse_peer(content: &str) -> Result<Recording, Error> {
    let lines: Vec<&str> = content.lines().collect();
    let (size_idx, size_line) = lines
        .iter()
        .enumerate()
        .find(|(_, line)| line.contains("NPTS=") && line.contains("DT="))
        .ok_or_else(|| ParseError::MissingKey("NPTS".to_string()))?;

    let declared: usize = field_after(size_line, "NPTS=")
        .map(|text| text.trim_end_matches(','))
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| ParseError::invalid_value("NPTS", *size_line, "not a count"))?;
    let dt: f64 = field_after(size_line, "DT=")
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| ParseError::invalid_value("DT", *size_line, "not a number"))?;

    let direction = size_idx
        .checked_sub(2)
        .and_then(|idx| lines.get(idx))
        .and_then(|line| line.rsplit_once(','))
        .map(|(_, direction)| direction.trim())
        .filter(|direction| !direction.is_empty())
        .unwrap_or("Amplitude");

    let mut samples = Vec::with_capacity(declared);
    for (idx, line) in lines.iter().enumerate().skip(size_idx + 1) {
        for field in line.split_whitespace() {
            let value = field.parse::<f64>().map_err(|_| ParseError::MalformedSample {
                line: idx + 1,
                text: line.to_string(),
            })?;
            samples.push(value);
        }
    }
    if samples.len() != declared {
        return Err(ParseError::SampleCount {
            declared,
            actual: samples.len(),
        }
        .into());
    }

    Ok(Recording::new(
        SignalFormat::Peer,
        dt,
        None,
        vec![Component::new(direction, samples)],
    )?)
}

/// First whitespace-separated token after `marker`.
fn field_after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = line.split_once(marker)?;
    rest.split_whitespace().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
PEER NGA STRONG MOTION DATABASE RECORD
Imperial Valley-06, 10/15/1979, Agrarias, UP
ACCELERATION TIME SERIES IN UNITS OF G
NPTS=  7, DT=   .0050 SEC
  .2349E-03  .2390E-03  .2420E-03  .2443E-03 -.2459E-03
  .1000E-02  -.5000E+00
";

    #[test]
    fn test_parse_peer() {
        let recording = parse_peer(SAMPLE).unwrap();
        assert_eq!(recording.format, SignalFormat::Peer);
        assert_eq!(recording.dt, 0.005);
        assert_eq!(recording.len(), 7);
        assert_eq!(recording.components[0].name, "UP");
        assert!(recording.components[0].is_vertical());
        assert_eq!(recording.components[0].samples[4], -0.0002459);
        assert_eq!(recording.components[0].samples[6], -0.5);
    }

    #[test]
    fn test_horizontal_direction() {
        let text = SAMPLE.replace("Agrarias, UP", "Agrarias, 090");
        let recording = parse_peer(&text).unwrap();
        assert_eq!(recording.components[0].name, "090");
        assert!(recording.vertical().is_none());
    }

    #[test]
    fn test_sample_count_must_match_header() {
        let text = SAMPLE.replace("NPTS=  7", "NPTS=  8");
        assert!(matches!(
            parse_peer(&text),
            Err(Error::Parse(ParseError::SampleCount {
                declared: 8,
                actual: 7
            }))
        ));
    }
}

//! Readers for recorded signal files.
//!
//! A [`Recording`] holds one or more components sampled on the same clock.
//! Plain ASCII, SESAME ASCII (SAF), MiniShark and PEER files are understood.
//! The format is detected from the content unless given explicitly.

mod minishark;
mod peer;
mod saf;

pub use minishark::parse_minishark;
pub use peer::parse_peer;
pub use saf::parse_saf;

use crate::core::signal::{Signal, SignalSpan};
use crate::error::{ConfigError, Error, ParseError};
use crate::params::types::SignalFormat;
use crate::params::WindowingParams;
use std::path::Path;

/// One recorded channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Channel name as written in the file, e.g. `V`, `N`, `E` or `UP`
    pub name: String,
    pub samples: Vec<f64>,
}

impl Component {
    pub fn new(name: impl Into<String>, samples: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    /// Whether the channel name denotes the vertical direction.
    pub fn is_vertical(&self) -> bool {
        let name = self.name.trim().to_ascii_uppercase();
        matches!(name.as_str(), "V" | "Z" | "UP" | "VT") || (name.len() == 3 && name.ends_with('Z'))
    }
}

/// Components read from one signal file.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub format: SignalFormat,
    /// Sample interval, seconds
    pub dt: f64,
    /// Time of the first sample, when the file records it
    pub start: Option<f64>,
    pub components: Vec<Component>,
}

impl Recording {
    /// Check the sample interval and that all components have the same
    /// length.
    pub fn new(
        format: SignalFormat,
        dt: f64,
        start: Option<f64>,
        components: Vec<Component>,
    ) -> Result<Self, ConfigError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::Signal(format!(
                "sample interval must be positive, got {dt}"
            )));
        }
        let Some(first) = components.first() else {
            return Err(ConfigError::Signal("no components".into()));
        };
        let len = first.samples.len();
        if let Some(other) = components.iter().find(|c| c.samples.len() != len) {
            return Err(ConfigError::Signal(format!(
                "component {} has {} samples, {} has {len}",
                other.name,
                other.samples.len(),
                first.name
            )));
        }
        Ok(Self {
            format,
            dt,
            start,
            components,
        })
    }

    pub fn read(path: &Path, format: Option<SignalFormat>, dt: Option<f64>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format, dt)
    }

    /// Parse file content. `dt` is required for plain ASCII; for the other
    /// formats it overrides the interval found in the header.
    pub fn parse(
        content: &str,
        format: Option<SignalFormat>,
        dt: Option<f64>,
    ) -> Result<Self, Error> {
        let format = format.unwrap_or_else(|| detect_format(content));

        let mut recording = match format {
            SignalFormat::Ascii => {
                let dt = dt.ok_or_else(|| {
                    ConfigError::Signal("plain ASCII signals need a sample interval".into())
                })?;
                let signal = Signal::parse_ascii(content, 0.0, dt)?;
                Self::new(
                    format,
                    dt,
                    None,
                    vec![Component::new("Amplitude", signal.samples)],
                )?
            }
            SignalFormat::Saf => parse_saf(content)?,
            SignalFormat::MiniShark => parse_minishark(content)?,
            SignalFormat::Peer => parse_peer(content)?,
        };

        if let Some(dt) = dt {
            if (dt - recording.dt).abs() > f64::EPSILON * dt.abs().max(1.0) {
                tracing::warn!(
                    header = recording.dt,
                    given = dt,
                    "Overriding the sample interval from the file header"
                );
                recording = Self::new(format, dt, recording.start, recording.components)?;
            }
        }

        tracing::debug!(
            format = %recording.format,
            components = recording.components.len(),
            samples = recording.len(),
            "Read signal file"
        );
        Ok(recording)
    }

    /// Samples per component.
    pub fn len(&self) -> usize {
        self.components.first().map_or(0, |c| c.samples.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vertical(&self) -> Option<&Component> {
        self.components.iter().find(|c| c.is_vertical())
    }

    /// One [`Signal`] per component, the first sample at `start`.
    pub fn signals(&self, start: f64) -> Result<Vec<Signal>, ConfigError> {
        self.components
            .iter()
            .map(|c| Signal::new(start, self.dt, c.samples.clone()))
            .collect()
    }

    /// Span of the record with bad samples from every component merged.
    pub fn span_with_bad_samples(
        &self,
        start: f64,
        params: &WindowingParams,
    ) -> Result<SignalSpan, ConfigError> {
        let signals = self.signals(start)?;
        let Some(first) = signals.first() else {
            return Err(ConfigError::Signal("no components".into()));
        };

        let mut flagged = Vec::new();
        for signal in &signals {
            flagged.extend(signal.bad_ranges(params)?);
        }
        tracing::info!(
            components = signals.len(),
            flagged = flagged.len(),
            "Flagged bad sample ranges"
        );
        Ok(first.span().with_bad_ranges(flagged))
    }
}

/// Guess the format from the first lines of a file.
pub fn detect_format(content: &str) -> SignalFormat {
    let head: Vec<&str> = content.lines().take(40).collect();

    if head
        .iter()
        .any(|line| line.contains("SESAME ASCII data format"))
    {
        return SignalFormat::Saf;
    }

    if head.iter().any(|line| {
        let line = line.trim_start();
        line.starts_with("#MiniShark") || line.starts_with("#Sample rate (sps):")
    }) {
        return SignalFormat::MiniShark;
    }

    if head
        .iter()
        .take(6)
        .any(|line| line.contains("NPTS=") && line.contains("DT="))
    {
        return SignalFormat::Peer;
    }

    SignalFormat::Ascii
}

/// Value of the first `key` in `(key, value)` header pairs, case-insensitive.
fn header_value<'a>(header: &'a [(String, String)], key: &str) -> Option<&'a str> {
    header
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

/// Parse a required header field.
fn required_header<T>(header: &[(String, String)], key: &str) -> Result<T, ParseError>
where
    T: std::str::FromStr,
{
    let value = header_value(header, key).ok_or_else(|| ParseError::MissingKey(key.to_string()))?;
    value
        .parse()
        .map_err(|_| ParseError::invalid_value(key, value, "not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signal::TimeRange;
    use crate::params::types::BadSampleThresholdType;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format("SESAME ASCII data format (saf) v. 1\nNDAT = 3\n"),
            SignalFormat::Saf
        );
        assert_eq!(
            detect_format("#MiniShark\n#Sample rate (sps):\t100\n"),
            SignalFormat::MiniShark
        );
        assert_eq!(
            detect_format("PEER NGA\nEvent, 1979, Station, UP\nACCELERATION\nNPTS=  3, DT=   .0100 SEC\n"),
            SignalFormat::Peer
        );
        assert_eq!(detect_format("# counts\n1.0\n2.0\n"), SignalFormat::Ascii);
    }

    #[test]
    fn test_ascii_needs_interval() {
        assert!(matches!(
            Recording::parse("1\n2\n3\n", None, None),
            Err(Error::Config(ConfigError::Signal(_)))
        ));

        let recording = Recording::parse("1\n2\n3\n", None, Some(0.5)).unwrap();
        assert_eq!(recording.format, SignalFormat::Ascii);
        assert_eq!(recording.len(), 3);
        assert_eq!(recording.dt, 0.5);
    }

    #[test]
    fn test_components_must_match() {
        let err = Recording::new(
            SignalFormat::Saf,
            0.01,
            None,
            vec![Component::new("V", vec![1.0, 2.0]), Component::new("N", vec![1.0])],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Signal(_)));
    }

    #[test]
    fn test_bad_samples_merge_across_components() {
        let recording = Recording::new(
            SignalFormat::MiniShark,
            1.0,
            None,
            vec![
                Component::new("V", vec![0.0, 9.0, 0.0, 0.0, 0.0, 0.0]),
                Component::new("N", vec![0.0, 0.0, 0.0, 0.0, 9.0, 0.0]),
                Component::new("E", vec![0.0; 6]),
            ],
        )
        .unwrap();

        let mut params = WindowingParams::default();
        params.bad_samples.threshold_type = BadSampleThresholdType::AbsoluteSampleThreshold;
        params.bad_samples.threshold = 5.0;

        let span = recording.span_with_bad_samples(100.0, &params).unwrap();
        assert_eq!(span.start, 100.0);
        assert_eq!(span.end, 105.0);
        assert_eq!(
            span.bad_ranges(),
            &[TimeRange::new(101.0, 102.0), TimeRange::new(104.0, 105.0)]
        );
        assert_eq!(recording.vertical().map(|c| c.name.as_str()), Some("V"));
    }
}

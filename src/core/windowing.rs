//! Time window selection over a signal span.
//!
//! Windows are laid out from the start of the selected time range with a
//! step of `length * (1 - overlap)`. Windows that overlap too much bad data
//! are skipped, and layout resumes right after the offending bad range.

use crate::core::signal::SignalSpan;
use crate::error::{ConfigError, Error};
use crate::params::types::{TimeBoundaryType, WindowLengthType};
use crate::params::WindowingParams;
use serde::{Deserialize, Serialize};

/// Slack allowed when comparing times, in seconds.
pub const TIME_EPSILON: f64 = 1e-6;

/// A selected time window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start time, seconds
    pub start: f64,
    /// End time, seconds
    pub end: f64,
    /// Nominal length, seconds
    pub length: f64,
}

impl TimeWindow {
    pub fn new(start: f64, length: f64) -> Self {
        Self {
            start,
            end: start + length,
            length,
        }
    }

    /// Check if a time falls within this window.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    /// Measured duration, `end - start`.
    pub fn duration_secs(&self) -> f64 {
        self.end - self.start
    }
}

/// Lays out windows according to a set of windowing parameters.
#[derive(Debug, Clone)]
pub struct WindowGenerator {
    params: WindowingParams,
}

impl WindowGenerator {
    /// Create a generator. Inconsistent parameters are rejected here, before
    /// any window is produced.
    pub fn new(params: WindowingParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &WindowingParams {
        &self.params
    }

    /// Resolve the FROM/TO boundaries against the signal and clip to it.
    pub fn range(&self, span: &SignalSpan) -> Result<(f64, f64), Error> {
        let from = &self.params.from;
        let to = &self.params.to;

        let from_value = match from.kind {
            TimeBoundaryType::Signal => Some(span.start),
            TimeBoundaryType::Absolute => Some(from.seconds()?),
            TimeBoundaryType::Delta => None,
        };
        let to_value = match to.kind {
            TimeBoundaryType::Signal => Some(span.end),
            TimeBoundaryType::Absolute => Some(to.seconds()?),
            TimeBoundaryType::Delta => None,
        };

        let (begin, end) = match (from_value, to_value) {
            (Some(begin), Some(end)) => (begin, end),
            (None, Some(end)) => (end - from.seconds()?, end),
            (Some(begin), None) => (begin, begin + to.seconds()?),
            (None, None) => return Err(ConfigError::BothDelta.into()),
        };

        let clipped = (begin.max(span.start), end.min(span.end));
        if clipped.1 <= clipped.0 {
            return Err(ConfigError::EmptyRange {
                from: begin,
                to: end,
            }
            .into());
        }
        Ok(clipped)
    }

    /// The length windows aim for before any shrinking.
    pub fn nominal_length(&self, span: &SignalSpan) -> f64 {
        let l = &self.params.length;
        let length = match l.kind {
            WindowLengthType::Exactly => {
                if (l.max - l.min).abs() > TIME_EPSILON {
                    tracing::warn!(
                        min = l.min,
                        max = l.max,
                        "Exact window length with differing min and max; using min"
                    );
                }
                l.min
            }
            WindowLengthType::AtLeast => l.max,
            WindowLengthType::FrequencyDependent => {
                let f_min = self.params.frequency.min;
                if f_min > 0.0 {
                    (l.period_count / f_min).clamp(l.min, l.max)
                } else {
                    l.max
                }
            }
        };
        self.fit(length, span)
    }

    /// Apply power-of-two quantization when requested.
    fn fit(&self, length: f64, span: &SignalSpan) -> f64 {
        if !self.params.length.power_of_two {
            return length;
        }
        match span.sampling_frequency {
            Some(fs) => power_of_two_length(length, fs),
            None => {
                tracing::warn!("Power-of-two lengths need a sampling frequency; ignoring");
                length
            }
        }
    }

    /// If the window `[start, end]` must be rejected, the time at which
    /// layout should resume.
    fn rejection(&self, span: &SignalSpan, start: f64, end: f64) -> Option<f64> {
        let bad = &self.params.bad_samples;
        let longest = span.longest_bad_within(start, end);
        let total = span.bad_duration_within(start, end);
        if longest > bad.gap || total > bad.tolerance {
            span.bad_within(start, end).next().map(|range| range.end)
        } else {
            None
        }
    }

    /// Generate windows over the signal.
    pub fn generate(&self, span: &SignalSpan) -> Result<Vec<TimeWindow>, Error> {
        span.validate()?;
        let (from, to) = self.range(span)?;
        let from = span.snap_up(from);

        let length = &self.params.length;
        let nominal = self.nominal_length(span);
        let required = match length.kind {
            WindowLengthType::AtLeast => length.min,
            _ => nominal,
        };
        let available = to - from;
        if available + TIME_EPSILON < required {
            return Err(ConfigError::SignalTooShort {
                available,
                required,
            }
            .into());
        }

        let advance = 1.0 - self.params.overlap_fraction();
        let step = nominal * advance;
        let mut windows: Vec<TimeWindow> = Vec::new();
        let mut rejected = 0usize;
        let mut anchor = from;
        let mut k = 0u64;

        loop {
            if length.max_count > 0 && windows.len() >= length.max_count {
                break;
            }

            let start = span.snap(anchor + k as f64 * step);
            let window_length = match length.kind {
                WindowLengthType::AtLeast => {
                    let room = to - start;
                    if room + TIME_EPSILON < length.min {
                        break;
                    }
                    match self.at_least_length(span, start, room) {
                        Some(window_length) => window_length,
                        None => {
                            tracing::warn!(
                                min = length.min,
                                max = length.max,
                                "No power-of-two length fits between min and max"
                            );
                            break;
                        }
                    }
                }
                _ => {
                    if start + nominal > to + TIME_EPSILON {
                        break;
                    }
                    nominal
                }
            };

            if let Some(resume) = self.rejection(span, start, start + window_length) {
                tracing::debug!(start, resume, "Window rejected for bad samples");
                rejected += 1;
                anchor = span.snap_up(resume);
                k = 0;
                continue;
            }

            windows.push(TimeWindow::new(start, window_length));
            match length.kind {
                WindowLengthType::AtLeast => {
                    anchor = start + window_length * advance;
                    k = 0;
                }
                _ => k += 1,
            }
        }

        tracing::info!(
            windows = windows.len(),
            rejected,
            from,
            to,
            "Generated time windows"
        );
        Ok(windows)
    }

    /// Longest length in `[min, max]` fitting in `room` and ending before the
    /// first disqualifying bad range. Falls back to the maximum fitting length
    /// when no shorter window is clean, so the caller rejects it.
    ///
    /// `None` when quantization leaves no length of at least `min`. Less room
    /// never helps, so no later window can be placed either.
    fn at_least_length(&self, span: &SignalSpan, start: f64, room: f64) -> Option<f64> {
        let l = &self.params.length;
        let longest = self.fit(l.max.min(room), span);
        if longest + TIME_EPSILON < l.min {
            return None;
        }
        if self.rejection(span, start, start + longest).is_none() {
            return Some(longest);
        }
        let cut = span
            .bad_within(start, start + longest)
            .next()
            .map(|range| range.start - start)
            .unwrap_or(longest);
        let shrunk = self.fit(cut, span);
        if shrunk + TIME_EPSILON >= l.min && self.rejection(span, start, start + shrunk).is_none() {
            Some(shrunk)
        } else {
            Some(longest)
        }
    }
}

/// Largest power-of-two sample count not above `length * fs`, in seconds.
pub fn power_of_two_length(length: f64, fs: f64) -> f64 {
    let samples = (length * fs).round();
    if samples < 1.0 {
        return length;
    }
    let samples = samples as u64;
    let pow = 1u64 << (63 - samples.leading_zeros());
    pow as f64 / fs
}

/// Convenience wrapper: validate, then generate.
pub fn generate_windows(
    params: &WindowingParams,
    span: &SignalSpan,
) -> Result<Vec<TimeWindow>, Error> {
    WindowGenerator::new(params.clone())?.generate(span)
}

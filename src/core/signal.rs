//! Signal spans and bad-sample detection.
//!
//! The window generator only needs to know where a signal starts and ends and
//! which parts of it are unusable. [`SignalSpan`] carries exactly that. A
//! sampled [`Signal`] can derive its span, flagging bad samples from an
//! amplitude threshold or STA/LTA anti-triggering on the raw or band-passed
//! record, and can be cut into the selected windows afterwards.

use crate::core::filter::Butterworth;
use crate::core::spectral::taper;
use crate::core::windowing::TimeWindow;
use crate::error::{ConfigError, Error, ParseError};
use crate::params::types::BadSampleThresholdType;
use crate::params::windowing::{BandFilter, StaLta, Taper};
use crate::params::WindowingParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A closed time interval in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Length of the part of `self` inside `[start, end]`.
    pub fn overlap(&self, start: f64, end: f64) -> f64 {
        (self.end.min(end) - self.start.max(start)).max(0.0)
    }
}

/// Extent of a signal plus its bad-sample ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSpan {
    pub start: f64,
    pub end: f64,
    /// Samples per second, when known
    pub sampling_frequency: Option<f64>,
    /// Sorted, non-overlapping
    bad: Vec<TimeRange>,
}

impl SignalSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            sampling_frequency: None,
            bad: Vec::new(),
        }
    }

    pub fn with_sampling_frequency(mut self, frequency: f64) -> Self {
        self.sampling_frequency = Some(frequency);
        self
    }

    /// Add bad ranges; they are sorted and merged with existing ones.
    pub fn with_bad_ranges(mut self, ranges: impl IntoIterator<Item = TimeRange>) -> Self {
        self.bad.extend(ranges.into_iter().filter(|r| r.end > r.start));
        self.bad.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut merged: Vec<TimeRange> = Vec::with_capacity(self.bad.len());
        for range in self.bad.drain(..) {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }
        self.bad = merged;
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn bad_ranges(&self) -> &[TimeRange] {
        &self.bad
    }

    /// Check the span is well formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(ConfigError::Signal("start and end must be finite".into()));
        }
        if self.end <= self.start {
            return Err(ConfigError::Signal(format!(
                "end {} is not after start {}",
                self.end, self.start
            )));
        }
        if let Some(fs) = self.sampling_frequency {
            if !(fs.is_finite() && fs > 0.0) {
                return Err(ConfigError::Signal(format!(
                    "sampling frequency must be positive, got {fs}"
                )));
            }
        }
        Ok(())
    }

    /// Bad ranges intersecting `[start, end]`.
    pub fn bad_within(&self, start: f64, end: f64) -> impl Iterator<Item = &TimeRange> {
        self.bad
            .iter()
            .filter(move |range| range.overlap(start, end) > 0.0)
    }

    /// Total bad duration inside `[start, end]`.
    pub fn bad_duration_within(&self, start: f64, end: f64) -> f64 {
        self.bad_within(start, end)
            .map(|range| range.overlap(start, end))
            .sum()
    }

    /// Longest single bad run inside `[start, end]`.
    pub fn longest_bad_within(&self, start: f64, end: f64) -> f64 {
        self.bad_within(start, end)
            .map(|range| range.overlap(start, end))
            .fold(0.0, f64::max)
    }

    /// Snap a time to the nearest sample of this signal, if sampled.
    pub fn snap(&self, time: f64) -> f64 {
        match self.sampling_frequency {
            Some(fs) => self.start + ((time - self.start) * fs).round() / fs,
            None => time,
        }
    }

    /// Snap a time to the first sample at or after it, if sampled.
    pub fn snap_up(&self, time: f64) -> f64 {
        match self.sampling_frequency {
            Some(fs) => self.start + ((time - self.start) * fs - 1e-9).ceil() / fs,
            None => time,
        }
    }
}

/// Trend removed by [`Signal::detrend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Detrend {
    /// Subtract the mean
    Constant,
    /// Subtract the least-squares line
    Linear,
}

/// A uniformly sampled amplitude record.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Time of the first sample, seconds
    pub start: f64,
    /// Sample interval, seconds
    pub dt: f64,
    pub samples: Vec<f64>,
}

impl Signal {
    pub fn new(start: f64, dt: f64, samples: Vec<f64>) -> Result<Self, ConfigError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::Signal(format!(
                "sample interval must be positive, got {dt}"
            )));
        }
        if samples.len() < 2 {
            return Err(ConfigError::Signal(
                "a signal needs at least two samples".into(),
            ));
        }
        Ok(Self { start, dt, samples })
    }

    /// Read one amplitude per line. `#` comments and blank lines are
    /// skipped; only the first column is used.
    pub fn read_ascii(path: &Path, start: f64, dt: f64) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_ascii(&content, start, dt)
    }

    pub fn parse_ascii(content: &str, start: f64, dt: f64) -> Result<Self, Error> {
        let mut samples = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let first = trimmed.split_whitespace().next().unwrap_or(trimmed);
            let value: f64 = first.parse().map_err(|_| ParseError::MalformedSample {
                line: idx + 1,
                text: line.to_string(),
            })?;
            samples.push(value);
        }
        tracing::debug!(samples = samples.len(), "Read ASCII signal");
        Ok(Self::new(start, dt, samples)?)
    }

    pub fn sampling_frequency(&self) -> f64 {
        1.0 / self.dt
    }

    /// Time of the last sample.
    pub fn end(&self) -> f64 {
        self.start + (self.samples.len() - 1) as f64 * self.dt
    }

    fn time(&self, index: usize) -> f64 {
        self.start + index as f64 * self.dt
    }

    /// Span without any bad samples.
    pub fn span(&self) -> SignalSpan {
        SignalSpan::new(self.start, self.end()).with_sampling_frequency(self.sampling_frequency())
    }

    /// Span with bad samples flagged according to the parameters.
    pub fn span_with_bad_samples(&self, params: &WindowingParams) -> Result<SignalSpan, ConfigError> {
        let flagged = self.bad_ranges(params)?;
        tracing::info!(flagged = flagged.len(), "Flagged bad sample ranges");
        Ok(self.span().with_bad_ranges(flagged))
    }

    /// Bad ranges from the amplitude threshold and anti-triggering, unmerged.
    pub fn bad_ranges(&self, params: &WindowingParams) -> Result<Vec<TimeRange>, ConfigError> {
        let mut flagged = self.flag_threshold(
            params.bad_samples.threshold_type,
            params.bad_samples.threshold,
        );

        let anti = &params.anti_triggering;
        if anti.raw {
            flagged.extend(self.flag_sta_lta(&anti.raw_detector));
        }
        if anti.filtered {
            match Butterworth::design(&anti.filter, self.sampling_frequency())? {
                Some(filter) => {
                    let filtered = self.with_samples(filter.filtfilt(&self.samples));
                    flagged.extend(filtered.flag_sta_lta(&anti.filtered_detector));
                }
                None => {
                    tracing::warn!("No filter corner frequencies; filtered anti-triggering skipped")
                }
            }
        }
        Ok(flagged)
    }

    fn with_samples(&self, samples: Vec<f64>) -> Self {
        Self {
            start: self.start,
            dt: self.dt,
            samples,
        }
    }

    /// Remove a constant or linear trend in place.
    pub fn detrend(&mut self, kind: Detrend) {
        let n = self.samples.len();
        if n == 0 {
            return;
        }
        let mean = self.samples.iter().sum::<f64>() / n as f64;
        match kind {
            Detrend::Constant => self.samples.iter_mut().for_each(|x| *x -= mean),
            Detrend::Linear => {
                let center = (n - 1) as f64 / 2.0;
                let (num, den) = self.samples.iter().enumerate().fold(
                    (0.0, 0.0),
                    |(num, den), (i, y)| {
                        let dx = i as f64 - center;
                        (num + dx * (y - mean), den + dx * dx)
                    },
                );
                let slope = if den > 0.0 { num / den } else { 0.0 };
                for (i, x) in self.samples.iter_mut().enumerate() {
                    *x -= mean + slope * (i as f64 - center);
                }
            }
        }
    }

    /// Multiply by the taper coefficients in place.
    pub fn apply_taper(&mut self, shape: &Taper) {
        let coefficients = taper(shape, self.samples.len());
        for (x, w) in self.samples.iter_mut().zip(coefficients) {
            *x *= w;
        }
    }

    /// Band-pass, high-pass or low-pass copy of this signal. Without corner
    /// frequencies the copy is unfiltered.
    pub fn filtered(&self, band: &BandFilter) -> Result<Self, ConfigError> {
        Ok(match Butterworth::design(band, self.sampling_frequency())? {
            Some(filter) => self.with_samples(filter.filtfilt(&self.samples)),
            None => self.clone(),
        })
    }

    /// Samples covering `window`, both edge samples included. Windows that
    /// touch therefore share their boundary sample.
    pub fn slice(&self, window: &TimeWindow) -> Result<Self, ConfigError> {
        let first = ((window.start - self.start) / self.dt).round();
        let last = ((window.end - self.start) / self.dt).round();
        if !(first >= 0.0 && last < self.samples.len() as f64 && last > first) {
            return Err(ConfigError::Signal(format!(
                "window [{}, {}] is outside the record [{}, {}]",
                window.start,
                window.end,
                self.start,
                self.end()
            )));
        }
        let (first, last) = (first as usize, last as usize);
        Self::new(
            self.time(first),
            self.dt,
            self.samples[first..=last].to_vec(),
        )
    }

    /// One slice per window.
    pub fn split(&self, windows: &[TimeWindow]) -> Result<Vec<Self>, ConfigError> {
        windows.iter().map(|window| self.slice(window)).collect()
    }

    /// Ranges of samples whose amplitude exceeds the threshold.
    pub fn flag_threshold(&self, kind: BadSampleThresholdType, threshold: f64) -> Vec<TimeRange> {
        let limit = match kind {
            BadSampleThresholdType::NoSampleThreshold => return Vec::new(),
            BadSampleThresholdType::AbsoluteSampleThreshold => threshold,
            BadSampleThresholdType::RelativeSampleThreshold => {
                let peak = self.samples.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
                peak * threshold / 100.0
            }
        };
        self.runs(|i| self.samples[i].abs() > limit)
    }

    /// Ranges where the short-term over long-term average of `|x|` leaves
    /// `[min_ratio, max_ratio]`.
    ///
    /// Both averages trail the current sample. Samples before the first full
    /// long-term window are not assessed.
    pub fn flag_sta_lta(&self, detector: &StaLta) -> Vec<TimeRange> {
        let StaLta {
            sta,
            lta,
            min_ratio,
            max_ratio,
        } = *detector;
        let n_sta = ((sta / self.dt).round() as usize).max(1);
        let n_lta = ((lta / self.dt).round() as usize).max(n_sta);
        if n_lta > self.samples.len() {
            tracing::warn!(
                lta,
                "Long-term average is longer than the signal; anti-triggering skipped"
            );
            return Vec::new();
        }

        let mut prefix = Vec::with_capacity(self.samples.len() + 1);
        prefix.push(0.0);
        for x in &self.samples {
            let last = prefix.last().copied().unwrap_or(0.0);
            prefix.push(last + x.abs());
        }
        let mean = |end: usize, n: usize| (prefix[end + 1] - prefix[end + 1 - n]) / n as f64;

        self.runs(|i| {
            if i + 1 < n_lta {
                return false;
            }
            let long = mean(i, n_lta);
            if long <= 0.0 {
                return false;
            }
            let ratio = mean(i, n_sta) / long;
            ratio < min_ratio || ratio > max_ratio
        })
    }

    /// Merge consecutive flagged samples into ranges. Each sample covers one
    /// sample period.
    fn runs(&self, flagged: impl Fn(usize) -> bool) -> Vec<TimeRange> {
        let mut ranges = Vec::new();
        let mut open: Option<usize> = None;
        for i in 0..self.samples.len() {
            match (flagged(i), open) {
                (true, None) => open = Some(i),
                (false, Some(first)) => {
                    ranges.push(TimeRange::new(self.time(first), self.time(i)));
                    open = None;
                }
                _ => {}
            }
        }
        if let Some(first) = open {
            ranges.push(TimeRange::new(
                self.time(first),
                self.time(self.samples.len()),
            ));
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> StaLta {
        StaLta {
            sta: 0.5,
            lta: 5.0,
            min_ratio: 0.2,
            max_ratio: 2.5,
        }
    }

    #[test]
    fn test_bad_ranges_are_merged() {
        let span = SignalSpan::new(0.0, 100.0).with_bad_ranges([
            TimeRange::new(50.0, 60.0),
            TimeRange::new(10.0, 20.0),
            TimeRange::new(15.0, 25.0),
            TimeRange::new(30.0, 30.0),
        ]);
        assert_eq!(
            span.bad_ranges(),
            &[TimeRange::new(10.0, 25.0), TimeRange::new(50.0, 60.0)]
        );
    }

    #[test]
    fn test_bad_duration_within() {
        let span = SignalSpan::new(0.0, 100.0)
            .with_bad_ranges([TimeRange::new(10.0, 20.0), TimeRange::new(30.0, 33.0)]);

        assert_eq!(span.bad_duration_within(15.0, 40.0), 8.0);
        assert_eq!(span.longest_bad_within(15.0, 40.0), 5.0);
        assert_eq!(span.bad_duration_within(40.0, 100.0), 0.0);
        assert_eq!(span.bad_duration_within(20.0, 30.0), 0.0);
    }

    #[test]
    fn test_span_validation() {
        assert!(SignalSpan::new(0.0, 10.0).validate().is_ok());
        assert!(SignalSpan::new(10.0, 10.0).validate().is_err());
        assert!(SignalSpan::new(0.0, 10.0)
            .with_sampling_frequency(0.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_snap_to_sample_grid() {
        let span = SignalSpan::new(1.0, 100.0).with_sampling_frequency(4.0);
        assert_eq!(span.snap(2.3), 2.25);
        assert_eq!(span.snap_up(2.3), 2.5);
        assert_eq!(span.snap_up(2.25), 2.25);
        assert_eq!(SignalSpan::new(1.0, 100.0).snap(2.3), 2.3);
    }

    #[test]
    fn test_absolute_threshold() {
        let signal = Signal::new(0.0, 1.0, vec![0.0, 5.0, 6.0, 0.0, 7.0]).unwrap();
        let ranges = signal.flag_threshold(BadSampleThresholdType::AbsoluteSampleThreshold, 4.0);
        assert_eq!(
            ranges,
            vec![TimeRange::new(1.0, 3.0), TimeRange::new(4.0, 5.0)]
        );
    }

    #[test]
    fn test_relative_threshold() {
        let signal = Signal::new(0.0, 0.5, vec![1.0, -10.0, 2.0, 9.5]).unwrap();
        let ranges = signal.flag_threshold(BadSampleThresholdType::RelativeSampleThreshold, 90.0);
        assert_eq!(
            ranges,
            vec![TimeRange::new(0.5, 1.0), TimeRange::new(1.5, 2.0)]
        );
        assert!(signal
            .flag_threshold(BadSampleThresholdType::NoSampleThreshold, 0.0)
            .is_empty());
    }

    #[test]
    fn test_sta_lta_flags_transient() {
        let mut samples = vec![1.0; 200];
        for x in samples.iter_mut().skip(120).take(5) {
            *x = 50.0;
        }
        let signal = Signal::new(0.0, 0.1, samples).unwrap();
        let ranges = signal.flag_sta_lta(&detector());

        assert!(!ranges.is_empty());
        let first = ranges[0];
        assert!(first.start >= 12.0 && first.start < 12.5);
        // Quiet samples before the transient stay unflagged.
        assert!(ranges.iter().all(|r| r.start >= 12.0));
    }

    #[test]
    fn test_sta_lta_quiet_signal() {
        let signal = Signal::new(0.0, 0.1, vec![1.0; 200]).unwrap();
        assert!(signal.flag_sta_lta(&detector()).is_empty());
    }

    #[test]
    fn test_parse_ascii() {
        let signal = Signal::parse_ascii("# header\n1.0 9\n\n-2.5\n3e1\n", 10.0, 0.01).unwrap();
        assert_eq!(signal.samples, vec![1.0, -2.5, 30.0]);
        assert!((signal.end() - 10.02).abs() < 1e-12);

        assert!(Signal::parse_ascii("1.0\nabc\n", 0.0, 0.01).is_err());
    }

    #[test]
    fn test_detrend() {
        let mut signal = Signal::new(0.0, 1.0, vec![1.0, 3.0, 5.0, 7.0]).unwrap();
        signal.detrend(Detrend::Linear);
        assert!(signal.samples.iter().all(|x| x.abs() < 1e-12));

        let mut signal = Signal::new(0.0, 1.0, vec![1.0, 3.0, 5.0, 7.0]).unwrap();
        signal.detrend(Detrend::Constant);
        assert_eq!(signal.samples, vec![-3.0, -1.0, 1.0, 3.0]);
    }

    #[test]
    fn test_split_shares_boundary_samples() {
        let signal = Signal::new(0.0, 0.5, (0..21).map(f64::from).collect()).unwrap();
        let windows = [TimeWindow::new(0.0, 5.0), TimeWindow::new(5.0, 5.0)];
        let pieces = signal.split(&windows).unwrap();

        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].samples.len(), 11);
        assert_eq!(pieces[0].samples.last(), pieces[1].samples.first());
        assert_eq!(pieces[1].start, 5.0);
        assert_eq!(pieces[1].samples.last(), Some(&20.0));

        assert!(signal.slice(&TimeWindow::new(8.0, 5.0)).is_err());
    }

    #[test]
    fn test_rectangular_taper_keeps_samples() {
        let mut signal = Signal::new(0.0, 1.0, vec![2.0; 8]).unwrap();
        signal.apply_taper(&Taper {
            shape: crate::params::types::WindowShape::Rectangular,
            reversed: false,
            alpha: 0.1,
        });
        assert_eq!(signal.samples, vec![2.0; 8]);
    }

    #[test]
    fn test_filtered_anti_triggering() {
        // A one-second 20 Hz burst over a slow swell and a 1 Hz hum.
        let fs = 100.0;
        let samples: Vec<f64> = (0..6000)
            .map(|i| {
                let t = i as f64 / fs;
                let swell = 100.0 * (2.0 * std::f64::consts::PI * 0.05 * t).sin();
                let hum = (2.0 * std::f64::consts::PI * 1.0 * t).sin();
                let burst = if (40.0..41.0).contains(&t) {
                    20.0 * (2.0 * std::f64::consts::PI * 20.0 * t).sin()
                } else {
                    0.0
                };
                swell + hum + burst
            })
            .collect();
        let signal = Signal::new(0.0, 1.0 / fs, samples).unwrap();

        let mut params = WindowingParams::default();
        params.anti_triggering.filtered = true;
        params.anti_triggering.filtered_detector = StaLta {
            sta: 0.5,
            lta: 10.0,
            min_ratio: 0.2,
            max_ratio: 2.5,
        };
        params.anti_triggering.filter = BandFilter {
            min_frequency: Some(10.0),
            max_frequency: None,
            order: 4,
        };

        let ranges = signal.bad_ranges(&params).unwrap();
        assert!(!ranges.is_empty());
        assert!(ranges.iter().any(|r| r.start > 39.0 && r.start < 41.0));
        assert!(ranges.iter().all(|r| r.end <= 15.0 || r.end > 39.0));

        params.anti_triggering.filter.max_frequency = Some(80.0);
        assert!(matches!(
            signal.bad_ranges(&params),
            Err(ConfigError::Filter(_))
        ));
    }
}

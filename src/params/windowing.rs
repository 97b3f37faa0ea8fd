//! Typed view of a parameter block.

use crate::error::{ConfigError, ParseError};
use crate::params::settings::Settings;
use crate::params::time_text::parse_time_text;
use crate::params::types::{
    format_flag, parse_flag, BadSampleThresholdType, FrequencySampling, HorizontalComponents,
    SmoothingMethod, SmoothingType, TimeBoundaryType, WindowLengthType, WindowShape,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Canonical parameter names.
pub mod keys {
    pub const SIGNAL_FILE: &str = "SIGNAL_FILE";
    pub const FROM_TIME_TYPE: &str = "FROM_TIME_TYPE";
    pub const FROM_TIME_TEXT: &str = "FROM_TIME_TEXT";
    pub const TO_TIME_TYPE: &str = "TO_TIME_TYPE";
    pub const TO_TIME_TEXT: &str = "TO_TIME_TEXT";
    pub const WINDOW_LENGTH_TYPE: &str = "WINDOW_LENGTH_TYPE";
    pub const WINDOW_MIN_LENGTH: &str = "WINDOW_MIN_LENGTH";
    pub const WINDOW_MAX_LENGTH: &str = "WINDOW_MAX_LENGTH";
    pub const WINDOW_MAX_COUNT: &str = "WINDOW_MAX_COUNT";
    pub const WINDOW_POWER_OF_TWO: &str = "WINDOW_POWER_OF_TWO";
    pub const WINDOW_PERIOD_COUNT: &str = "WINDOW_PERIOD_COUNT";
    pub const BAD_SAMPLE_TOLERANCE: &str = "BAD_SAMPLE_TOLERANCE";
    pub const BAD_SAMPLE_GAP: &str = "BAD_SAMPLE_GAP";
    pub const WINDOW_OVERLAP: &str = "WINDOW_OVERLAP";
    pub const BAD_SAMPLE_THRESHOLD_TYPE: &str = "BAD_SAMPLE_THRESHOLD_TYPE";
    pub const BAD_SAMPLE_THRESHOLD: &str = "BAD_SAMPLE_THRESHOLD";
    pub const ANTI_TRIGGERING_ON_RAW_SIGNAL: &str = "ANTI-TRIGGERING_ON_RAW_SIGNAL";
    pub const ANTI_TRIGGERING_ON_FILTERED_SIGNAL: &str = "ANTI-TRIGGERING_ON_FILTERED_SIGNAL";
    pub const RAW_STA: &str = "RAW_STA";
    pub const RAW_LTA: &str = "RAW_LTA";
    pub const RAW_MIN_SLTA: &str = "RAW_MIN_SLTA";
    pub const RAW_MAX_SLTA: &str = "RAW_MAX_SLTA";
    pub const FILTERED_STA: &str = "FILTERED_STA";
    pub const FILTERED_LTA: &str = "FILTERED_LTA";
    pub const FILTERED_MIN_SLTA: &str = "FILTERED_MIN_SLTA";
    pub const FILTERED_MAX_SLTA: &str = "FILTERED_MAX_SLTA";
    pub const FILTER_MIN_FREQUENCY: &str = "FILTER_MIN_FREQUENCY";
    pub const FILTER_MAX_FREQUENCY: &str = "FILTER_MAX_FREQUENCY";
    pub const FILTER_ORDER: &str = "FILTER_ORDER";
    pub const SMOOTHING_METHOD: &str = "SMOOTHING_METHOD";
    pub const SMOOTHING_TYPE: &str = "SMOOTHING_TYPE";
    pub const SMOOTHING_CONSTANT: &str = "SMOOTHING_CONSTANT";
    pub const SMOOTHING_WIDTH: &str = "SMOOTHING_WIDTH";
    pub const WINDOW_TYPE: &str = "WINDOW_TYPE";
    pub const WINDOW_REVERSED: &str = "WINDOW_REVERSED";
    pub const WINDOW_ALPHA: &str = "WINDOW_ALPHA";
    pub const MINIMUM_FREQUENCY: &str = "MINIMUM_FREQUENCY";
    pub const MAXIMUM_FREQUENCY: &str = "MAXIMUM_FREQUENCY";
    pub const SAMPLING_TYPE_FREQUENCY: &str = "SAMPLING_TYPE_FREQUENCY";
    pub const SAMPLING_NUMBER_FREQUENCY: &str = "SAMPLING_NUMBER_FREQUENCY";
    pub const STEP_FREQUENCY: &str = "STEP_FREQUENCY";
    pub const HORIZONTAL_COMPONENTS: &str = "HORIZONTAL_COMPONENTS";
}

/// A FROM or TO boundary of the analysed time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBoundary {
    pub kind: TimeBoundaryType,
    pub text: String,
}

impl TimeBoundary {
    pub fn signal() -> Self {
        Self {
            kind: TimeBoundaryType::Signal,
            text: String::new(),
        }
    }

    pub fn absolute(seconds: f64) -> Self {
        Self {
            kind: TimeBoundaryType::Absolute,
            text: seconds.to_string(),
        }
    }

    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            kind: TimeBoundaryType::Delta,
            text: text.into(),
        }
    }

    /// Seconds encoded by the time text.
    pub fn seconds(&self) -> Result<f64, ParseError> {
        parse_time_text(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowLength {
    pub kind: WindowLengthType,
    /// Seconds
    pub min: f64,
    /// Seconds
    pub max: f64,
    /// 0 means unlimited
    pub max_count: usize,
    pub power_of_two: bool,
    /// Cycles of the minimum frequency for frequency-dependent lengths
    pub period_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadSamples {
    /// Cumulative bad duration a window may contain, seconds
    pub tolerance: f64,
    /// Longest single bad run a window may contain, seconds
    pub gap: f64,
    pub threshold_type: BadSampleThresholdType,
    pub threshold: f64,
}

/// STA/LTA detector settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaLta {
    /// Short-term average length, seconds
    pub sta: f64,
    /// Long-term average length, seconds
    pub lta: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
}

/// Butterworth corners in Hz. A missing corner leaves that side open, so
/// a lone minimum is a high-pass and a lone maximum a low-pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandFilter {
    pub min_frequency: Option<f64>,
    pub max_frequency: Option<f64>,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntiTriggering {
    pub raw: bool,
    pub filtered: bool,
    pub raw_detector: StaLta,
    pub filtered_detector: StaLta,
    /// Applied before the filtered detector
    pub filter: BandFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Smoothing {
    pub method: SmoothingMethod,
    pub kind: SmoothingType,
    /// Konno-Ohmachi bandwidth coefficient
    pub constant: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taper {
    pub shape: WindowShape,
    pub reversed: bool,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub min: f64,
    pub max: f64,
    pub sampling: FrequencySampling,
    /// Number of samples; 0 means use `step`
    pub count: usize,
    pub step: f64,
}

/// All windowing-related parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowingParams {
    pub signal_file: Option<String>,
    pub from: TimeBoundary,
    pub to: TimeBoundary,
    pub length: WindowLength,
    /// Percent of the window length shared with the next window
    pub overlap_percent: f64,
    pub bad_samples: BadSamples,
    pub anti_triggering: AntiTriggering,
    pub smoothing: Smoothing,
    pub taper: Taper,
    pub frequency: FrequencyRange,
    pub horizontal_components: HorizontalComponents,
}

impl Default for WindowingParams {
    fn default() -> Self {
        Self {
            signal_file: None,
            from: TimeBoundary::signal(),
            to: TimeBoundary::signal(),
            length: WindowLength {
                kind: WindowLengthType::Exactly,
                min: 60.0,
                max: 60.0,
                max_count: 0,
                power_of_two: false,
                period_count: 10.0,
            },
            overlap_percent: 0.0,
            bad_samples: BadSamples {
                tolerance: 0.0,
                gap: 0.0,
                threshold_type: BadSampleThresholdType::NoSampleThreshold,
                threshold: 99.0,
            },
            anti_triggering: AntiTriggering {
                raw: false,
                filtered: false,
                raw_detector: StaLta {
                    sta: 1.0,
                    lta: 30.0,
                    min_ratio: 0.2,
                    max_ratio: 2.5,
                },
                filtered_detector: StaLta {
                    sta: 1.0,
                    lta: 30.0,
                    min_ratio: 0.2,
                    max_ratio: 2.5,
                },
                filter: BandFilter {
                    min_frequency: None,
                    max_frequency: None,
                    order: 5,
                },
            },
            smoothing: Smoothing {
                method: SmoothingMethod::Function,
                kind: SmoothingType::KonnoOhmachi,
                constant: 40.0,
                width: 0.1,
            },
            taper: Taper {
                shape: WindowShape::Tukey,
                reversed: false,
                alpha: 0.1,
            },
            frequency: FrequencyRange {
                min: 0.2,
                max: 20.0,
                sampling: FrequencySampling::Log,
                count: 100,
                step: 1.025,
            },
            horizontal_components: HorizontalComponents::Squared,
        }
    }
}

/// Typed lookups over a [`Settings`] block.
struct Reader<'a> {
    settings: &'a Settings,
}

impl<'a> Reader<'a> {
    fn raw(&self, key: &str) -> Option<&'a str> {
        self.settings.get(key).map(str::trim)
    }

    fn required(&self, key: &str) -> Result<&'a str, ParseError> {
        self.raw(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ParseError::MissingKey(key.to_string()))
    }

    fn parsed<T>(&self, key: &str, value: &str) -> Result<T, ParseError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        value
            .parse::<T>()
            .map_err(|e| ParseError::invalid_value(key, value, e.to_string()))
    }

    fn required_parsed<T>(&self, key: &str) -> Result<T, ParseError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        self.parsed(key, self.required(key)?)
    }

    fn required_seconds(&self, key: &str) -> Result<f64, ParseError> {
        let value: f64 = self.required_parsed(key)?;
        finite(key, value, self.raw(key))
    }

    /// Missing or empty values fall back to `default`.
    fn or<T>(&self, key: &str, default: T) -> Result<T, ParseError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        match self.raw(key) {
            Some(value) if !value.is_empty() => self.parsed(key, value),
            _ => Ok(default),
        }
    }

    fn flag_or(&self, key: &str, default: bool) -> Result<bool, ParseError> {
        match self.raw(key) {
            Some(value) if !value.is_empty() => parse_flag(value)
                .ok_or_else(|| ParseError::invalid_value(key, value, "expected y or n")),
            _ => Ok(default),
        }
    }

    fn seconds_or(&self, key: &str, default: f64) -> Result<f64, ParseError> {
        let value: f64 = self.or(key, default)?;
        finite(key, value, self.raw(key))
    }

    fn optional_seconds(&self, key: &str) -> Result<Option<f64>, ParseError> {
        match self.raw(key) {
            Some(value) if !value.is_empty() => {
                let value: f64 = self.parsed(key, value)?;
                finite(key, value, self.raw(key)).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn detector(
        &self,
        [sta, lta, min, max]: [&str; 4],
        default: StaLta,
    ) -> Result<StaLta, ParseError> {
        Ok(StaLta {
            sta: self.seconds_or(sta, default.sta)?,
            lta: self.seconds_or(lta, default.lta)?,
            min_ratio: self.seconds_or(min, default.min_ratio)?,
            max_ratio: self.seconds_or(max, default.max_ratio)?,
        })
    }

    fn boundary(&self, type_key: &str, text_key: &str) -> Result<TimeBoundary, ParseError> {
        let kind = self.or(type_key, TimeBoundaryType::Signal)?;
        let text = self.raw(text_key).unwrap_or_default().to_string();
        let boundary = TimeBoundary { kind, text };
        if kind != TimeBoundaryType::Signal {
            // Surface bad time text at parse time rather than at generation.
            boundary
                .seconds()
                .map_err(|e| ParseError::invalid_value(text_key, &boundary.text, e.to_string()))?;
        }
        Ok(boundary)
    }
}

fn finite(key: &str, value: f64, raw: Option<&str>) -> Result<f64, ParseError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParseError::invalid_value(
            key,
            raw.unwrap_or_default(),
            "value is not finite",
        ))
    }
}

impl WindowingParams {
    /// Build typed parameters from a parsed block.
    ///
    /// Fails with a [`ParseError`] when a required key is absent or a value
    /// cannot be read. Consistency between values is checked separately by
    /// [`WindowingParams::validate`].
    pub fn from_settings(settings: &Settings) -> Result<Self, ParseError> {
        let r = Reader { settings };
        let d = Self::default();

        let length = WindowLength {
            kind: r.required_parsed(keys::WINDOW_LENGTH_TYPE)?,
            min: r.required_seconds(keys::WINDOW_MIN_LENGTH)?,
            max: r.required_seconds(keys::WINDOW_MAX_LENGTH)?,
            max_count: r.or(keys::WINDOW_MAX_COUNT, d.length.max_count)?,
            power_of_two: r.flag_or(keys::WINDOW_POWER_OF_TWO, d.length.power_of_two)?,
            period_count: r.seconds_or(keys::WINDOW_PERIOD_COUNT, d.length.period_count)?,
        };

        Ok(Self {
            signal_file: r
                .raw(keys::SIGNAL_FILE)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            from: r.boundary(keys::FROM_TIME_TYPE, keys::FROM_TIME_TEXT)?,
            to: r.boundary(keys::TO_TIME_TYPE, keys::TO_TIME_TEXT)?,
            length,
            overlap_percent: r.seconds_or(keys::WINDOW_OVERLAP, d.overlap_percent)?,
            bad_samples: BadSamples {
                tolerance: r.seconds_or(keys::BAD_SAMPLE_TOLERANCE, d.bad_samples.tolerance)?,
                gap: r.seconds_or(keys::BAD_SAMPLE_GAP, d.bad_samples.gap)?,
                threshold_type: r.or(
                    keys::BAD_SAMPLE_THRESHOLD_TYPE,
                    d.bad_samples.threshold_type,
                )?,
                threshold: r.seconds_or(keys::BAD_SAMPLE_THRESHOLD, d.bad_samples.threshold)?,
            },
            anti_triggering: AntiTriggering {
                raw: r.flag_or(keys::ANTI_TRIGGERING_ON_RAW_SIGNAL, d.anti_triggering.raw)?,
                filtered: r.flag_or(
                    keys::ANTI_TRIGGERING_ON_FILTERED_SIGNAL,
                    d.anti_triggering.filtered,
                )?,
                raw_detector: r.detector(
                    [keys::RAW_STA, keys::RAW_LTA, keys::RAW_MIN_SLTA, keys::RAW_MAX_SLTA],
                    d.anti_triggering.raw_detector,
                )?,
                filtered_detector: r.detector(
                    [
                        keys::FILTERED_STA,
                        keys::FILTERED_LTA,
                        keys::FILTERED_MIN_SLTA,
                        keys::FILTERED_MAX_SLTA,
                    ],
                    d.anti_triggering.filtered_detector,
                )?,
                filter: BandFilter {
                    min_frequency: r.optional_seconds(keys::FILTER_MIN_FREQUENCY)?,
                    max_frequency: r.optional_seconds(keys::FILTER_MAX_FREQUENCY)?,
                    order: r.or(keys::FILTER_ORDER, d.anti_triggering.filter.order)?,
                },
            },
            smoothing: Smoothing {
                method: r.or(keys::SMOOTHING_METHOD, d.smoothing.method)?,
                kind: r.or(keys::SMOOTHING_TYPE, d.smoothing.kind)?,
                constant: r.seconds_or(keys::SMOOTHING_CONSTANT, d.smoothing.constant)?,
                width: r.seconds_or(keys::SMOOTHING_WIDTH, d.smoothing.width)?,
            },
            taper: Taper {
                shape: r.or(keys::WINDOW_TYPE, d.taper.shape)?,
                reversed: r.flag_or(keys::WINDOW_REVERSED, d.taper.reversed)?,
                alpha: r.seconds_or(keys::WINDOW_ALPHA, d.taper.alpha)?,
            },
            frequency: FrequencyRange {
                min: r.seconds_or(keys::MINIMUM_FREQUENCY, d.frequency.min)?,
                max: r.seconds_or(keys::MAXIMUM_FREQUENCY, d.frequency.max)?,
                sampling: r.or(keys::SAMPLING_TYPE_FREQUENCY, d.frequency.sampling)?,
                count: r.or(keys::SAMPLING_NUMBER_FREQUENCY, d.frequency.count)?,
                step: r.seconds_or(keys::STEP_FREQUENCY, d.frequency.step)?,
            },
            horizontal_components: r.or(keys::HORIZONTAL_COMPONENTS, d.horizontal_components)?,
        })
    }

    /// Check that the values are consistent with each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let WindowLength {
            min,
            max,
            period_count,
            ..
        } = self.length;
        for (name, value) in [
            (keys::WINDOW_MIN_LENGTH, min),
            (keys::WINDOW_MAX_LENGTH, max),
            (keys::WINDOW_PERIOD_COUNT, period_count),
            (keys::MINIMUM_FREQUENCY, self.frequency.min),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name, value });
            }
        }
        if min > max {
            return Err(ConfigError::LengthRange { min, max });
        }
        if min <= 0.0 {
            return Err(ConfigError::NonPositiveLength(min));
        }
        if !(0.0..100.0).contains(&self.overlap_percent) {
            return Err(ConfigError::Overlap(self.overlap_percent));
        }
        if self.from.kind == TimeBoundaryType::Delta && self.to.kind == TimeBoundaryType::Delta {
            return Err(ConfigError::BothDelta);
        }
        Ok(())
    }

    /// Fraction of a window shared with the next one.
    pub fn overlap_fraction(&self) -> f64 {
        self.overlap_percent / 100.0
    }

    /// Write every parameter into a fresh block using canonical keys and the
    /// usual unit suffixes.
    pub fn to_settings(&self) -> Settings {
        let mut s = Settings::new();
        s.push_comment("# Windowing parameters");
        if let Some(file) = &self.signal_file {
            s.set(keys::SIGNAL_FILE, file.as_str());
        }
        s.set(keys::FROM_TIME_TYPE, self.from.kind.as_str());
        s.set(keys::FROM_TIME_TEXT, self.from.text.as_str());
        s.set(keys::TO_TIME_TYPE, self.to.kind.as_str());
        s.set(keys::TO_TIME_TEXT, self.to.text.as_str());

        s.set(keys::WINDOW_LENGTH_TYPE, self.length.kind.as_str());
        s.set("WINDOW_MIN_LENGTH(s)", self.length.min.to_string());
        s.set("WINDOW_MAX_LENGTH(s)", self.length.max.to_string());
        s.set(keys::WINDOW_MAX_COUNT, self.length.max_count.to_string());
        s.set(
            "WINDOW_POWER_OF_TWO (y/n)",
            format_flag(self.length.power_of_two),
        );
        s.set(keys::WINDOW_PERIOD_COUNT, self.length.period_count.to_string());
        s.set(
            "BAD_SAMPLE_TOLERANCE (s)",
            self.bad_samples.tolerance.to_string(),
        );
        s.set("BAD_SAMPLE_GAP (s)", self.bad_samples.gap.to_string());
        s.set("WINDOW_OVERLAP (%)", self.overlap_percent.to_string());
        s.set(
            keys::BAD_SAMPLE_THRESHOLD_TYPE,
            self.bad_samples.threshold_type.as_str(),
        );
        s.set(
            keys::BAD_SAMPLE_THRESHOLD,
            self.bad_samples.threshold.to_string(),
        );

        s.set(
            "ANTI-TRIGGERING_ON_RAW_SIGNAL (y/n)",
            format_flag(self.anti_triggering.raw),
        );
        let raw = &self.anti_triggering.raw_detector;
        s.set("RAW_STA (s)", raw.sta.to_string());
        s.set("RAW_LTA (s)", raw.lta.to_string());
        s.set(keys::RAW_MIN_SLTA, raw.min_ratio.to_string());
        s.set(keys::RAW_MAX_SLTA, raw.max_ratio.to_string());
        s.set(
            "ANTI-TRIGGERING_ON_FILTERED_SIGNAL (y/n)",
            format_flag(self.anti_triggering.filtered),
        );
        let filtered = &self.anti_triggering.filtered_detector;
        s.set("FILTERED_STA (s)", filtered.sta.to_string());
        s.set("FILTERED_LTA (s)", filtered.lta.to_string());
        s.set(keys::FILTERED_MIN_SLTA, filtered.min_ratio.to_string());
        s.set(keys::FILTERED_MAX_SLTA, filtered.max_ratio.to_string());
        let filter = &self.anti_triggering.filter;
        if let Some(min) = filter.min_frequency {
            s.set("FILTER_MIN_FREQUENCY (Hz)", min.to_string());
        }
        if let Some(max) = filter.max_frequency {
            s.set("FILTER_MAX_FREQUENCY (Hz)", max.to_string());
        }
        s.set(keys::FILTER_ORDER, filter.order.to_string());

        s.set(keys::SMOOTHING_METHOD, self.smoothing.method.as_str());
        s.set(keys::SMOOTHING_TYPE, self.smoothing.kind.as_str());
        s.set(keys::SMOOTHING_CONSTANT, self.smoothing.constant.to_string());
        s.set(keys::SMOOTHING_WIDTH, self.smoothing.width.to_string());

        s.set(keys::WINDOW_TYPE, self.taper.shape.as_str());
        s.set(keys::WINDOW_REVERSED, format_flag(self.taper.reversed));
        s.set(keys::WINDOW_ALPHA, self.taper.alpha.to_string());

        s.set(keys::MINIMUM_FREQUENCY, self.frequency.min.to_string());
        s.set(keys::MAXIMUM_FREQUENCY, self.frequency.max.to_string());
        s.set(
            keys::SAMPLING_TYPE_FREQUENCY,
            self.frequency.sampling.as_str(),
        );
        s.set(
            keys::SAMPLING_NUMBER_FREQUENCY,
            self.frequency.count.to_string(),
        );
        s.set(keys::STEP_FREQUENCY, self.frequency.step.to_string());
        s.set(
            keys::HORIZONTAL_COMPONENTS,
            self.horizontal_components.as_str(),
        );
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
WINDOW_LENGTH_TYPE=Exactly
WINDOW_MIN_LENGTH(s)=59.99
WINDOW_MAX_LENGTH(s)=59.99
WINDOW_MAX_COUNT=0
WINDOW_POWER_OF_TWO (y/n)=n
BAD_SAMPLE_TOLERANCE (s)=0
BAD_SAMPLE_GAP (s)=0
WINDOW_OVERLAP (%)=0
BAD_SAMPLE_THRESHOLD_TYPE=NoSampleThreshold
ANTI-TRIGGERING_ON_RAW_SIGNAL (y/n)=n
SMOOTHING_TYPE=KonnoOhmachi
SMOOTHING_CONSTANT=40
HORIZONTAL_COMPONENTS=Squared";

    fn params(text: &str) -> Result<WindowingParams, ParseError> {
        WindowingParams::from_settings(&Settings::parse(text).unwrap())
    }

    #[test]
    fn test_sample_parameters() {
        let p = params(SAMPLE).unwrap();
        assert_eq!(p.length.kind, WindowLengthType::Exactly);
        assert_eq!(p.length.min, 59.99);
        assert_eq!(p.length.max, 59.99);
        assert_eq!(p.length.max_count, 0);
        assert!(!p.length.power_of_two);
        assert_eq!(p.overlap_percent, 0.0);
        assert_eq!(p.smoothing.constant, 40.0);
        assert_eq!(p.from, TimeBoundary::signal());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_missing_required_key() {
        let err = params("WINDOW_LENGTH_TYPE=Exactly\nWINDOW_MIN_LENGTH=10").unwrap_err();
        assert_eq!(err, ParseError::MissingKey("WINDOW_MAX_LENGTH".to_string()));
    }

    #[test]
    fn test_invalid_value_names_key() {
        let text = SAMPLE.replace("WINDOW_OVERLAP (%)=0", "WINDOW_OVERLAP (%)=half");
        match params(&text).unwrap_err() {
            ParseError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "WINDOW_OVERLAP");
                assert_eq!(value, "half");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_time_text_is_reported_early() {
        let text = format!("{SAMPLE}\nFROM_TIME_TYPE=Absolute\nFROM_TIME_TEXT=3x");
        assert!(matches!(
            params(&text),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_min_greater_than_max_is_config_error() {
        let text = SAMPLE.replace("WINDOW_MAX_LENGTH(s)=59.99", "WINDOW_MAX_LENGTH(s)=30");
        let p = params(&text).unwrap();
        assert_eq!(
            p.validate(),
            Err(ConfigError::LengthRange {
                min: 59.99,
                max: 30.0
            })
        );
    }

    #[test]
    fn test_nan_length_is_rejected() {
        let text = SAMPLE.replace("WINDOW_MIN_LENGTH(s)=59.99", "WINDOW_MIN_LENGTH(s)=NaN");
        match params(&text).unwrap_err() {
            ParseError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "WINDOW_MIN_LENGTH");
                assert_eq!(value, "NaN");
            }
            other => panic!("unexpected error: {other}"),
        }

        let text = SAMPLE.replace("WINDOW_MAX_LENGTH(s)=59.99", "WINDOW_MAX_LENGTH(s)=inf");
        assert!(matches!(
            params(&text),
            Err(ParseError::InvalidValue { .. })
        ));

        let mut p = params(SAMPLE).unwrap();
        p.length.max = f64::NAN;
        assert!(matches!(
            p.validate(),
            Err(ConfigError::NotFinite {
                name: "WINDOW_MAX_LENGTH",
                ..
            })
        ));
    }

    #[test]
    fn test_both_delta_is_config_error() {
        let text = format!(
            "{SAMPLE}\nFROM_TIME_TYPE=Delta\nFROM_TIME_TEXT=1h\nTO_TIME_TYPE=Delta\nTO_TIME_TEXT=2h"
        );
        let p = params(&text).unwrap();
        assert_eq!(p.from, TimeBoundary::delta("1h"));
        assert_eq!(p.validate(), Err(ConfigError::BothDelta));
    }

    #[test]
    fn test_filtered_anti_triggering_keys() {
        let text = format!(
            "{SAMPLE}\nANTI-TRIGGERING_ON_FILTERED_SIGNAL (y/n)=y\nFILTERED_STA (s)=2\nFILTER_MIN_FREQUENCY (Hz)=1\nFILTER_MAX_FREQUENCY (Hz)=10"
        );
        let p = params(&text).unwrap();
        let anti = &p.anti_triggering;
        assert!(anti.filtered);
        assert_eq!(anti.filtered_detector.sta, 2.0);
        assert_eq!(anti.filtered_detector.lta, 30.0);
        assert_eq!(anti.filter.min_frequency, Some(1.0));
        assert_eq!(anti.filter.max_frequency, Some(10.0));
        assert_eq!(anti.filter.order, 5);
        assert_eq!(WindowingParams::default().anti_triggering.filter.min_frequency, None);
    }

    #[test]
    fn test_overlap_out_of_range() {
        let mut p = params(SAMPLE).unwrap();
        p.overlap_percent = 100.0;
        assert_eq!(p.validate(), Err(ConfigError::Overlap(100.0)));
    }

    #[test]
    fn test_to_settings_reads_back() {
        let mut p = WindowingParams::default();
        p.from = TimeBoundary::absolute(-52_423_200.0);
        p.to = TimeBoundary::delta("1h");
        p.length.power_of_two = true;
        p.signal_file = Some("station.txt".to_string());
        p.anti_triggering.filtered = true;
        p.anti_triggering.filter.min_frequency = Some(0.5);
        p.anti_triggering.filtered_detector.lta = 20.0;

        let back = WindowingParams::from_settings(&p.to_settings()).unwrap();
        assert_eq!(back, p);
    }
}

//! Error types shared across the crate.

use thiserror::Error;

/// Malformed input: a bad line, section or value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: expected a comment or KEY=VALUE pair, found {text:?}")]
    MalformedLine { line: usize, text: String },

    #[error("line {line}: empty key")]
    EmptyKey { line: usize },

    #[error("missing required parameter {0}")]
    MissingKey(String),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("line {line}: section {name:?} is never closed")]
    UnclosedSection { line: usize, name: String },

    #[error("line {line}: unexpected end marker for section {name:?}")]
    UnexpectedEnd { line: usize, name: String },

    #[error("line {line}: malformed time window row {text:?}")]
    MalformedRow { line: usize, text: String },

    #[error("invalid time text {text:?}: {reason}")]
    TimeText { text: String, reason: String },

    #[error("line {line}: invalid sample {text:?}")]
    MalformedSample { line: usize, text: String },

    #[error("header declares {declared} samples but {actual} were read")]
    SampleCount { declared: usize, actual: usize },
}

impl ParseError {
    pub(crate) fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ParseError::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn time_text(text: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::TimeText {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

/// Parameter values that parse fine but do not fit together.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window minimum length {min}s is greater than maximum length {max}s")]
    LengthRange { min: f64, max: f64 },

    #[error("{name} must be a finite number, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("window length must be positive, got {0}s")]
    NonPositiveLength(f64),

    #[error("window overlap must be within [0, 100), got {0}%")]
    Overlap(f64),

    #[error("signal range {available}s is shorter than one window of {required}s")]
    SignalTooShort { available: f64, required: f64 },

    #[error("time range [{from}, {to}] is empty after clipping to the signal")]
    EmptyRange { from: f64, to: f64 },

    #[error("FROM and TO boundaries cannot both be Delta")]
    BothDelta,

    #[error("declared window count {declared} does not match {actual} rows")]
    CountMismatch { declared: usize, actual: usize },

    #[error("invalid frequency range: {0}")]
    Frequency(String),

    #[error("invalid signal: {0}")]
    Signal(String),

    #[error("invalid filter: {0}")]
    Filter(String),
}

/// Umbrella error for operations that touch the filesystem.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Core functionality for HVSR windowing.
//!
//! This module contains:
//! - Signal file readers (plain ASCII, SAF, MiniShark, PEER)
//! - Signal spans, detrending, slicing and bad-sample detection
//! - Zero-phase Butterworth filtering
//! - Time window generation
//! - Frequency sampling, tapers and smoothing for the selected windows

pub mod filter;
pub mod formats;
pub mod signal;
pub mod spectral;
pub mod windowing;

// Re-export commonly used types
pub use filter::Butterworth;
pub use formats::{detect_format, Component, Recording};
pub use signal::{Detrend, Signal, SignalSpan, TimeRange};
pub use spectral::{frequency_grid, konno_ohmachi_weight, smooth, taper};
pub use windowing::{generate_windows, TimeWindow, WindowGenerator, TIME_EPSILON};

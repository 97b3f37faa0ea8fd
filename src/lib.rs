//! HVSR Windowing - time window selection for horizontal-to-vertical
//! spectral ratio processing.
//!
//! This library reads the parameter/log files used to describe a windowing
//! run, lays out time windows over a signal, and writes the resulting window
//! table back in the same format.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        HVSR Windowing                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌──────────────┐   ┌─────────────────┐     │
//! │  │  Settings   │──▶│  Windowing   │──▶│   Window        │     │
//! │  │  (KEY=VAL)  │   │   Params     │   │   Generator     │     │
//! │  └─────────────┘   └──────────────┘   └─────────────────┘     │
//! │         ▲                                     │    ▲          │
//! │         │                                     ▼    │          │
//! │  ┌─────────────┐                     ┌──────────┐ ┌────────┐  │
//! │  │ Log reader  │◀───── file ────────▶│Log writer│ │ Signal │  │
//! │  └─────────────┘                     └──────────┘ └────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use hvsr_windowing::{generate_windows, Settings, SignalSpan, WindowingParams};
//!
//! let settings = Settings::parse(
//!     "WINDOW_LENGTH_TYPE=Exactly\n\
//!      WINDOW_MIN_LENGTH(s)=60\n\
//!      WINDOW_MAX_LENGTH(s)=60\n\
//!      WINDOW_OVERLAP (%)=0",
//! )
//! .unwrap();
//! let params = WindowingParams::from_settings(&settings).unwrap();
//!
//! let windows = generate_windows(&params, &SignalSpan::new(0.0, 600.0)).unwrap();
//! assert_eq!(windows.len(), 10);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod params;

// Re-export key types at crate root for convenience
pub use crate::config::Config;
pub use crate::core::{
    generate_windows, Recording, Signal, SignalSpan, TimeRange, TimeWindow, WindowGenerator,
};
pub use crate::error::{ConfigError, Error, ParseError, Result};
pub use crate::log::{LogDocument, WindowingLog};
pub use crate::params::{parse_time_text, Settings, TimeBoundary, WindowingParams};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

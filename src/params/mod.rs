//! Parameter blocks: raw `KEY=VALUE` settings and their typed view.

pub mod settings;
pub mod time_text;
pub mod types;
pub mod windowing;

// Re-export commonly used types
pub use settings::{canonical_name, Entry, ParamLine, Settings};
pub use time_text::{format_duration, parse_time_text};
pub use types::SignalFormat;
pub use windowing::{keys, BandFilter, StaLta, TimeBoundary, WindowingParams};

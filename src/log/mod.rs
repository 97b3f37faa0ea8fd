//! Reading and writing windowing log files.
//!
//! A log file is made of framed sections; see [`document`] for the layout.

pub mod document;
pub mod section;

// Re-export commonly used types
pub use document::{LengthMismatch, LogDocument, WindowingLog, DEFAULT_ANNOTATION};

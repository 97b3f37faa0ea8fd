//! The windowing log file: parameters, annotation and time window table.
//!
//! ```text
//! ### Parameters ###
//! WINDOW_LENGTH_TYPE=Exactly
//! ...
//! ### End Parameters ###
//! ### Windowing Log ###
//! Automatic windowing
//! ### End Windowing Log ###
//! ### Time Windows ###
//! # Number= 60
//! # Start time 	 End Time 	 Window length
//! -52423200	-52423140.01	59.99
//! ...
//! ### End Time Windows ###
//! ```

use crate::core::windowing::TimeWindow;
use crate::error::{ConfigError, Error, ParseError};
use crate::log::section::{self, split_sections, PARAMETERS, TIME_WINDOWS, WINDOWING_LOG};
use crate::params::Settings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Annotation written for generated windows.
pub const DEFAULT_ANNOTATION: &str = "Automatic windowing";

const COUNT_PREFIX: &str = "# Number=";
const TABLE_HEADER: &str = "# Start time \t End Time \t Window length";

/// Annotation plus the ordered window table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowingLog {
    pub annotation: Vec<String>,
    pub windows: Vec<TimeWindow>,
}

/// A row whose measured duration disagrees with its declared length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthMismatch {
    pub index: usize,
    pub window: TimeWindow,
    pub difference: f64,
}

impl WindowingLog {
    pub fn new(windows: Vec<TimeWindow>) -> Self {
        Self {
            annotation: vec![DEFAULT_ANNOTATION.to_string()],
            windows,
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Rows where `end - start` differs from `length` by more than `tolerance`.
    pub fn verify_lengths(&self, tolerance: f64) -> Vec<LengthMismatch> {
        self.windows
            .iter()
            .enumerate()
            .filter_map(|(index, window)| {
                let difference = window.duration_secs() - window.length;
                (difference.abs() > tolerance).then_some(LengthMismatch {
                    index,
                    window: *window,
                    difference,
                })
            })
            .collect()
    }

    /// Whether start times never decrease.
    pub fn is_ordered(&self) -> bool {
        self.windows.windows(2).all(|pair| pair[1].start >= pair[0].start)
    }

    /// Sum of declared window lengths.
    pub fn total_duration(&self) -> f64 {
        self.windows.iter().map(|w| w.length).sum()
    }

    /// Parse the lines of a `Time Windows` section.
    pub fn parse_table<'a, I>(lines: I) -> Result<Vec<TimeWindow>, Error>
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let mut declared: Option<usize> = None;
        let mut windows = Vec::new();

        for (number, line) in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(count) = trimmed.strip_prefix(COUNT_PREFIX) {
                let count = count.trim();
                declared = Some(count.parse().map_err(|_| ParseError::MalformedRow {
                    line: number,
                    text: line.to_string(),
                })?);
                continue;
            }
            if trimmed.starts_with('#') {
                continue;
            }
            windows.push(parse_row(number, line)?);
        }

        if let Some(declared) = declared {
            if declared != windows.len() {
                return Err(ConfigError::CountMismatch {
                    declared,
                    actual: windows.len(),
                }
                .into());
            }
        }
        Ok(windows)
    }

    fn write_table(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", section::begin(TIME_WINDOWS))?;
        writeln!(f, "{COUNT_PREFIX} {}", self.windows.len())?;
        writeln!(f, "{TABLE_HEADER}")?;
        for w in &self.windows {
            writeln!(
                f,
                "{}\t{}\t{}",
                format_seconds(w.start),
                format_seconds(w.end),
                format_seconds(w.length)
            )?;
        }
        writeln!(f, "{}", section::end(TIME_WINDOWS))
    }
}

/// Microsecond resolution, trailing zeros dropped.
fn format_seconds(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" => "0".to_string(),
        _ => text.to_string(),
    }
}

fn parse_row(number: usize, line: &str) -> Result<TimeWindow, ParseError> {
    let malformed = || ParseError::MalformedRow {
        line: number,
        text: line.to_string(),
    };
    let values = line
        .split_whitespace()
        .map(|field| field.parse::<f64>().map_err(|_| malformed()))
        .collect::<Result<Vec<f64>, _>>()?;
    match values.as_slice() {
        [start, end, length] if values.iter().all(|v| v.is_finite()) => Ok(TimeWindow {
            start: *start,
            end: *end,
            length: *length,
        }),
        _ => Err(malformed()),
    }
}

fn is_known_section(name: &str) -> bool {
    [PARAMETERS, WINDOWING_LOG, TIME_WINDOWS]
        .iter()
        .any(|known| name.eq_ignore_ascii_case(known))
}

/// A complete log file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogDocument {
    pub settings: Settings,
    pub log: WindowingLog,
}

impl LogDocument {
    pub fn new(settings: Settings, windows: Vec<TimeWindow>) -> Self {
        Self {
            settings,
            log: WindowingLog::new(windows),
        }
    }

    /// Parse a log file. Unknown sections are skipped.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let sections = split_sections(text)?;

        if let Some((number, line)) = sections
            .loose
            .iter()
            .find(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        {
            return Err(ParseError::MalformedLine {
                line: *number,
                text: line.to_string(),
            }
            .into());
        }

        let settings = match sections.find(PARAMETERS) {
            Some(params) => Settings::from_lines(params.lines.iter().copied())?,
            None => Settings::default(),
        };

        let annotation = sections
            .find(WINDOWING_LOG)
            .map(|log| {
                log.lines
                    .iter()
                    .map(|(_, line)| line.trim_end().to_string())
                    .filter(|line| !line.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let windows = match sections.find(TIME_WINDOWS) {
            Some(table) => WindowingLog::parse_table(table.lines.iter().copied())?,
            None => Vec::new(),
        };

        for skipped in sections
            .sections
            .iter()
            .filter(|s| !is_known_section(s.name))
        {
            tracing::debug!(section = skipped.name, line = skipped.line, "Skipping unknown section");
        }

        Ok(Self {
            settings,
            log: WindowingLog {
                annotation,
                windows,
            },
        })
    }

    pub fn read_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn write_file(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_string())?;
        tracing::info!(path = %path.display(), windows = self.log.len(), "Wrote windowing log");
        Ok(())
    }
}

impl fmt::Display for LogDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", section::begin(PARAMETERS))?;
        write!(f, "{}", self.settings)?;
        writeln!(f, "{}", section::end(PARAMETERS))?;

        writeln!(f, "{}", section::begin(WINDOWING_LOG))?;
        for line in &self.log.annotation {
            writeln!(f, "{line}")?;
        }
        writeln!(f, "{}", section::end(WINDOWING_LOG))?;

        self.log.write_table(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> LogDocument {
        let settings = Settings::parse("WINDOW_LENGTH_TYPE=Exactly\nWINDOW_MIN_LENGTH(s)=10").unwrap();
        let windows = vec![TimeWindow::new(0.0, 10.0), TimeWindow::new(10.0, 10.0)];
        LogDocument::new(settings, windows)
    }

    #[test]
    fn test_write_layout() {
        let text = document().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "### Parameters ###");
        assert_eq!(lines[3], "### End Parameters ###");
        assert_eq!(lines[5], "Automatic windowing");
        assert_eq!(lines[8], "# Number= 2");
        assert_eq!(lines[10], "0\t10\t10");
        assert_eq!(lines.last(), Some(&"### End Time Windows ###"));
    }

    #[test]
    fn test_parse_back() {
        let doc = document();
        let parsed = LogDocument::parse(&doc.to_string()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_rows_accept_scientific_and_spaces() {
        let lines = [
            (1, "# Number= 2"),
            (2, "-5.24232e+07\t-5.242314001e7\t59.99"),
            (3, "  1e1   2e1  10 "),
        ];
        let windows = WindowingLog::parse_table(lines).unwrap();
        assert_eq!(windows[0].start, -52_423_200.0);
        assert_eq!(windows[1].end, 20.0);
    }

    #[test]
    fn test_count_mismatch() {
        let lines = [(1, "# Number= 3"), (2, "0\t10\t10")];
        let err = WindowingLog::parse_table(lines).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::CountMismatch {
                declared: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_malformed_row() {
        let lines = [(7, "0\t10")];
        let err = WindowingLog::parse_table(lines).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::MalformedRow { line: 7, .. })
        ));
    }

    #[test]
    fn test_text_outside_sections_is_rejected() {
        let err = LogDocument::parse("stray\n### Parameters ###\n### End Parameters ###").unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::MalformedLine { line: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_sections_are_skipped() {
        let text = "### Extra ###\nanything = goes\n### End Extra ###\n### Time Windows ###\n0 1 1\n### End Time Windows ###";
        let doc = LogDocument::parse(text).unwrap();
        assert_eq!(doc.log.len(), 1);
        assert!(doc.settings.is_empty());
    }

    #[test]
    fn test_rows_are_written_at_microsecond_resolution() {
        let start = -52_423_200.0 + 2.0 * 59.99;
        let doc = LogDocument::new(Settings::default(), vec![TimeWindow::new(start, 59.99)]);
        let text = doc.to_string();

        assert!(text.contains("\n-52423080.02\t-52423020.03\t59.99\n"));
        assert_eq!(format_seconds(-52_423_200.0), "-52423200");
        assert_eq!(format_seconds(-0.0000001), "0");

        let back = LogDocument::parse(&text).unwrap();
        assert!((back.log.windows[0].start - start).abs() < 1e-6);
    }

    #[test]
    fn test_section_names_ignore_case() {
        let text = "### parameters ###\nWINDOW_LENGTH_TYPE=Exactly\n### end parameters ###\n### TIME WINDOWS ###\n0 1 1\n### End Time Windows ###";
        let sections = split_sections(text).unwrap();
        let unknown: Vec<&str> = sections
            .sections
            .iter()
            .filter(|s| !is_known_section(s.name))
            .map(|s| s.name)
            .collect();
        assert!(unknown.is_empty());

        let doc = LogDocument::parse(text).unwrap();
        assert_eq!(doc.settings.get("WINDOW_LENGTH_TYPE"), Some("Exactly"));
        assert_eq!(doc.log.len(), 1);
    }

    #[test]
    fn test_verify_lengths() {
        let log = WindowingLog::new(vec![
            TimeWindow::new(0.0, 10.0),
            TimeWindow {
                start: 10.0,
                end: 20.5,
                length: 10.0,
            },
        ]);
        let mismatches = log.verify_lengths(0.01);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].index, 1);
        assert!(log.is_ordered());
        assert_eq!(log.total_duration(), 20.0);
    }
}

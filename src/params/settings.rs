//! Ordered `KEY=VALUE` parameter block.
//!
//! Lines are kept exactly as read so that writing a parsed block back out
//! reproduces every entry byte for byte. Lookups go through the canonical
//! key name, which drops any unit suffix such as `(s)` or ` (%)`.

use crate::error::ParseError;
use crate::log::section::{split_sections, PARAMETERS};
use serde::Serialize;
use std::fmt;

/// A single `KEY=VALUE` entry, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    key: String,
    value: String,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The key as written, including any unit suffix.
    pub fn raw_key(&self) -> &str {
        &self.key
    }

    /// The key without unit suffix or surrounding whitespace.
    pub fn name(&self) -> &str {
        canonical_name(&self.key)
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// One line of a parameter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamLine {
    Comment(String),
    Entry(Entry),
}

impl fmt::Display for ParamLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamLine::Comment(text) => f.write_str(text),
            ParamLine::Entry(entry) => write!(f, "{}={}", entry.key, entry.value),
        }
    }
}

/// Parameter block in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    lines: Vec<ParamLine>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whole file or a bare parameter block.
    ///
    /// If the text contains section markers, only the `Parameters` section is
    /// read. Otherwise every line is treated as part of the block.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let sections = split_sections(text)?;
        if sections.sections.is_empty() {
            return Self::from_lines(sections.loose);
        }
        match sections.find(PARAMETERS) {
            Some(section) => Self::from_lines(section.lines.iter().copied()),
            None => Ok(Self::default()),
        }
    }

    /// Build from `(line_number, text)` pairs belonging to the block.
    pub fn from_lines<'a, I>(lines: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let mut settings = Self::default();
        for (number, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            if line.trim_start().starts_with('#') {
                settings.lines.push(ParamLine::Comment(line.to_string()));
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ParseError::MalformedLine {
                    line: number,
                    text: line.to_string(),
                });
            };
            if canonical_name(key).is_empty() {
                return Err(ParseError::EmptyKey { line: number });
            }
            settings.lines.push(ParamLine::Entry(Entry::new(key, value)));
        }
        Ok(settings)
    }

    /// Value of the last entry whose canonical name matches `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name).map(Entry::value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn find(&self, name: &str) -> Option<&Entry> {
        self.entries()
            .filter(|entry| entry.name().eq_ignore_ascii_case(name))
            .last()
    }

    /// Replace the value of an existing entry, or append a new one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let name = canonical_name(key);
        let existing = self.lines.iter_mut().rev().find_map(|line| match line {
            ParamLine::Entry(entry) if entry.name().eq_ignore_ascii_case(name) => Some(entry),
            _ => None,
        });
        match existing {
            Some(entry) => entry.value = value.into(),
            None => self.lines.push(ParamLine::Entry(Entry::new(key, value))),
        }
    }

    pub fn push_comment(&mut self, text: &str) {
        let line = if text.starts_with('#') {
            text.to_string()
        } else {
            format!("# {text}")
        };
        self.lines.push(ParamLine::Comment(line));
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.lines.iter().filter_map(|line| match line {
            ParamLine::Entry(entry) => Some(entry),
            ParamLine::Comment(_) => None,
        })
    }

    pub fn lines(&self) -> &[ParamLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Strip the unit suffix from a raw key: `WINDOW_OVERLAP (%)` -> `WINDOW_OVERLAP`.
pub fn canonical_name(raw: &str) -> &str {
    match raw.find('(') {
        Some(idx) => raw[..idx].trim(),
        None => raw.trim(),
    }
}

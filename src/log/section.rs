//! Section framing: `### Name ###` ... `### End Name ###`.

use crate::error::ParseError;

pub const PARAMETERS: &str = "Parameters";
pub const WINDOWING_LOG: &str = "Windowing Log";
pub const TIME_WINDOWS: &str = "Time Windows";

/// A section delimiter line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker<'a> {
    Begin(&'a str),
    End(&'a str),
}

impl<'a> Marker<'a> {
    /// Recognize a delimiter line, if it is one.
    pub fn parse(line: &'a str) -> Option<Self> {
        let inner = line
            .trim()
            .strip_prefix("###")?
            .strip_suffix("###")?
            .trim();
        if inner.is_empty() {
            return None;
        }
        match inner.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("end ") => {
                Some(Marker::End(inner[4..].trim()))
            }
            _ => Some(Marker::Begin(inner)),
        }
    }
}

/// Opening line for a section.
pub fn begin(name: &str) -> String {
    format!("### {name} ###")
}

/// Closing line for a section.
pub fn end(name: &str) -> String {
    format!("### End {name} ###")
}

/// Lines of one framed section, with 1-based line numbers.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub name: &'a str,
    pub line: usize,
    pub lines: Vec<(usize, &'a str)>,
}

/// A file split into its sections plus any lines outside them.
#[derive(Debug, Clone, Default)]
pub struct Sections<'a> {
    pub sections: Vec<Section<'a>>,
    pub loose: Vec<(usize, &'a str)>,
}

impl<'a> Sections<'a> {
    pub fn find(&self, name: &str) -> Option<&Section<'a>> {
        self.sections
            .iter()
            .find(|section| section.name.eq_ignore_ascii_case(name))
    }
}

/// Split text into framed sections. Sections do not nest.
pub fn split_sections(text: &str) -> Result<Sections<'_>, ParseError> {
    let mut result = Sections::default();
    let mut current: Option<Section<'_>> = None;

    for (idx, line) in text.lines().enumerate() {
        let number = idx + 1;
        match Marker::parse(line) {
            Some(Marker::Begin(name)) => {
                if let Some(open) = &current {
                    return Err(ParseError::UnclosedSection {
                        line: open.line,
                        name: open.name.to_string(),
                    });
                }
                current = Some(Section {
                    name,
                    line: number,
                    lines: Vec::new(),
                });
            }
            Some(Marker::End(name)) => match current.take() {
                Some(open) if name.eq_ignore_ascii_case(open.name) => {
                    result.sections.push(open);
                }
                _ => {
                    return Err(ParseError::UnexpectedEnd {
                        line: number,
                        name: name.to_string(),
                    });
                }
            },
            None => match current.as_mut() {
                Some(open) => open.lines.push((number, line)),
                None => result.loose.push((number, line)),
            },
        }
    }

    if let Some(open) = current {
        return Err(ParseError::UnclosedSection {
            line: open.line,
            name: open.name.to_string(),
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_parsing() {
        assert_eq!(
            Marker::parse("### Parameters ###"),
            Some(Marker::Begin("Parameters"))
        );
        assert_eq!(
            Marker::parse("### End Time Windows ###"),
            Some(Marker::End("Time Windows"))
        );
        assert_eq!(
            Marker::parse("### end parameters ###"),
            Some(Marker::End("parameters"))
        );
        assert_eq!(Marker::parse("# Number= 60"), None);
        assert_eq!(Marker::parse("######"), None);
    }

    #[test]
    fn test_split_sections() {
        let text = "### A ###\none\n### End A ###\nloose\n### B ###\ntwo\nthree\n### End B ###";
        let sections = split_sections(text).unwrap();

        assert_eq!(sections.sections.len(), 2);
        assert_eq!(sections.find("a").unwrap().lines, vec![(2, "one")]);
        assert_eq!(sections.find("B").unwrap().lines.len(), 2);
        assert_eq!(sections.loose, vec![(4, "loose")]);
    }

    #[test]
    fn test_unclosed_section() {
        let err = split_sections("### A ###\none").unwrap_err();
        assert!(matches!(err, ParseError::UnclosedSection { line: 1, .. }));
    }

    #[test]
    fn test_mismatched_end() {
        let err = split_sections("### A ###\n### End B ###").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEnd { line: 2, .. }));
    }
}

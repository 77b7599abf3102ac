use std::io::BufRead;

use log::debug;

use crate::config::ParserConfig;
use crate::report::{CrashReport, ParseError};

/// Parser for MIME-header style report stanzas.
///
/// A stanza is a run of `Key: value` lines ended by a blank line or end of
/// input; a final line without a line terminator is still parsed. Lines
/// starting with a space or tab continue the previous value and are folded
/// into it with a single space.
///
/// Lines that are neither a field nor a continuation are malformed. A
/// lenient parser (the default) skips them together with their
/// continuation lines; a strict parser fails with
/// [`ParseError::MalformedHeader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportParser {
    strict: bool,
}

enum Line<'a> {
    Field(&'a str, &'a str),
    Continuation(&'a str),
    Malformed,
}

fn classify(line: &str) -> Line<'_> {
    if line.starts_with(' ') || line.starts_with('\t') {
        return Line::Continuation(line.trim());
    }

    match line.split_once(':') {
        Some((key, value)) if is_valid_key(key) => Line::Field(key, value.trim()),
        _ => Line::Malformed,
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.chars().any(|c| c.is_whitespace() || c.is_control())
}

impl ReportParser {
    pub fn new(strict: bool) -> Self {
        ReportParser { strict }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        ReportParser::new(config.strict)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Parse the first stanza of `reader`.
    ///
    /// Input without any field yields an empty report.
    pub fn parse<R: BufRead>(&self, reader: R) -> Result<CrashReport, ParseError> {
        let mut reader = reader;
        Ok(self.parse_next(&mut reader)?.unwrap_or_default())
    }

    /// Parse the next stanza of `reader`.
    ///
    /// Returns `None` once the input is exhausted. Calling this repeatedly
    /// walks a multi-stanza file such as the dpkg status database.
    pub fn parse_next<R: BufRead>(&self, reader: &mut R) -> Result<Option<CrashReport>, ParseError> {
        let mut report = CrashReport::new();
        let mut current: Option<String> = None;
        let mut buf = Vec::new();
        let mut line_no = 0;
        let mut consumed_any = false;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;
            consumed_any = true;

            let text = String::from_utf8_lossy(&buf);
            let line = text.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                // Leading blank lines separate stanzas, they do not end one.
                if report.is_empty() && current.is_none() {
                    continue;
                }
                break;
            }

            match classify(line) {
                Line::Field(key, value) => {
                    report.push(key, value.to_string());
                    current = Some(key.to_string());
                }
                Line::Continuation(rest) => match &current {
                    Some(key) => report.fold_into_last(key, rest),
                    None => self.malformed(line_no, line)?,
                },
                Line::Malformed => {
                    self.malformed(line_no, line)?;
                    current = None;
                }
            }
        }

        if !consumed_any {
            return Ok(None);
        }

        Ok(Some(report))
    }

    fn malformed(&self, line_no: usize, line: &str) -> Result<(), ParseError> {
        if self.strict {
            return Err(ParseError::MalformedHeader {
                line: line_no,
                content: line.to_string(),
            });
        }

        debug!("Skipping malformed report line {}: {:?}", line_no, line);
        Ok(())
    }
}

//! Crash report model, parser and upload field policy.
//!
//! A crash report is a block of `Key: value` lines in the style of a MIME
//! header. Keys may repeat and are kept exactly as written.
//!
//! ```
//! use crash_agent::report::{CrashReport, ReportParser};
//!
//! let text = "ProblemType: Crash\nExecutablePath: /usr/bin/foo\n";
//! let report = ReportParser::default().parse(text.as_bytes()).unwrap();
//!
//! assert_eq!(report.first("ProblemType"), Some("Crash"));
//! assert_eq!(report.len(), 2);
//! ```

use std::collections::HashMap;
use std::io;

use thiserror::Error;

/// MIME-header style parser for report files
pub mod parser;

/// Field classification applied before upload
pub mod policy;

pub use parser::ReportParser;
pub use policy::{FieldClass, FieldPolicy};

/// Errors raised while parsing a report
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read crash report: {0}")]
    Io(#[from] io::Error),

    /// Only raised by a strict parser; lenient parsers skip such lines.
    #[error("malformed header at line {line}: {content:?}")]
    MalformedHeader { line: usize, content: String },
}

/// One named field with all its values in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    values: Vec<String>,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// Ordered multimap from field name to values.
///
/// Field order is the order of first appearance. Built once by the parser
/// and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrashReport {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl CrashReport {
    pub fn new() -> Self {
        CrashReport::default()
    }

    /// Append `value` to the field `name`, creating the field if needed
    pub(crate) fn push(&mut self, name: &str, value: String) {
        match self.index.get(name) {
            Some(&i) => self.fields[i].values.push(value),
            None => {
                self.index.insert(name.to_string(), self.fields.len());
                self.fields.push(Field {
                    name: name.to_string(),
                    values: vec![value],
                });
            }
        }
    }

    /// Extend the most recent value of `name` with a folded continuation line
    pub(crate) fn fold_into_last(&mut self, name: &str, continuation: &str) {
        if let Some(&i) = self.index.get(name) {
            if let Some(last) = self.fields[i].values.last_mut() {
                if !last.is_empty() {
                    last.push(' ');
                }
                last.push_str(continuation);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.index.get(name).map(|&i| self.fields[i].values.as_slice())
    }

    /// First value of `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|values| values.first()).map(String::as_str)
    }

    /// First value of `name` if it is present and not empty
    pub fn first_non_empty(&self, name: &str) -> Option<&str> {
        self.first(name).filter(|value| !value.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Number of distinct field names
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for CrashReport {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut report = CrashReport::new();
        for (name, value) in iter {
            report.push(name.as_ref(), value.into());
        }
        report
    }
}

//! Iteration over the crash reports stored in a directory.
//!
//! [`for_each_report_in_dir`] lists a directory, parses every entry carrying
//! the report suffix and hands the result to a [`ReportVisitor`]. A file that
//! cannot be read or parsed is reported through
//! [`ReportVisitor::on_error`] and the sweep moves on to the next entry.
//! Only a directory that cannot be listed ends a sweep early.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;

use crate::report::{CrashReport, ParseError, ReportParser};

/// Visitors acting on swept reports
pub mod visitors;

pub use visitors::{ListingVisitor, UploadSummary, UploadVisitor};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("failed to read crash directory {}: {source}", dir.display())]
    DirectoryUnreadable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse crash report {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: ParseError,
    },

    /// The file parsed but held no field at all
    #[error("crash report {name} contains no fields")]
    EmptyReport { name: String },
}

/// Handles the outcome of each swept entry.
#[async_trait]
pub trait ReportVisitor: Send {
    /// Called for every report that parsed successfully
    async fn on_report(&mut self, name: &str, report: CrashReport);

    /// Called for every failure, directory level or per entry
    fn on_error(&mut self, error: SweepError);
}

/// Parse every `*<suffix>` file in `dir` in name order and pass it to `visitor`.
///
/// Returns the number of entries that matched the suffix.
pub async fn for_each_report_in_dir<V>(
    dir: &Path,
    suffix: &str,
    parser: ReportParser,
    visitor: &mut V,
) -> usize
where
    V: ReportVisitor + ?Sized,
{
    let names = match list_reports(dir, suffix).await {
        Ok(names) => names,
        Err(source) => {
            warn!("Failed to read crash directory {}: {}", dir.display(), source);
            visitor.on_error(SweepError::DirectoryUnreadable {
                dir: dir.to_path_buf(),
                source,
            });
            return 0;
        }
    };

    debug!("Found {} crash reports in {}", names.len(), dir.display());

    for name in &names {
        match load_report(&dir.join(name), name, parser).await {
            Ok(report) => visitor.on_report(name, report).await,
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                visitor.on_error(e);
            }
        }
    }

    names.len()
}

async fn list_reports(dir: &Path, suffix: &str) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(suffix) {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

async fn load_report(path: &Path, name: &str, parser: ReportParser) -> Result<CrashReport, SweepError> {
    let entry_error = |source: ParseError| SweepError::Entry {
        name: name.to_string(),
        source,
    };

    let content = tokio::fs::read(path)
        .await
        .map_err(|e| entry_error(ParseError::Io(e)))?;
    let report = parser.parse(content.as_slice()).map_err(entry_error)?;

    if report.is_empty() {
        return Err(SweepError::EmptyReport { name: name.to_string() });
    }

    Ok(report)
}

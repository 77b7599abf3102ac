//! Test utilities for crash_agent
//!
//! Shared fixtures for the unit test modules.

#![cfg(test)]

use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A typical report written by the crash handler
pub const SAMPLE_REPORT: &str = "\
ProblemType: Crash
Architecture: amd64
Date: Mon Jan  1 00:00:00 2024
ExecutablePath: /usr/bin/foo
Package: foo 1.0-1
Signal: 11
CoreDump: base64
 H4sICAAAAAAC/0NvcmVEdW1wAA==
Stacktrace:
 #0  0x00007f in raise () from /lib/libc.so.6
 #1  0x00007f in abort () from /lib/libc.so.6
";

/// Creates a crash directory holding `files` as `(name, content)` pairs
pub fn create_crash_dir(files: &[(&str, &str)]) -> Result<TempDir> {
    let dir = TempDir::new()?;
    write_files(dir.path(), files)?;
    Ok(dir)
}

/// Writes `files` below `dir`, creating parent directories as needed
pub fn write_files(dir: &Path, files: &[(&str, &str)]) -> Result<()> {
    for (name, content) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportParser;

    #[test]
    fn test_sample_report_parses() {
        let report = ReportParser::new(true).parse(SAMPLE_REPORT.as_bytes()).unwrap();
        assert_eq!(report.first("ExecutablePath"), Some("/usr/bin/foo"));
        assert_eq!(report.first("CoreDump"), Some("base64 H4sICAAAAAAC/0NvcmVEdW1wAA=="));
    }

    #[test]
    fn test_create_crash_dir() {
        let dir = create_crash_dir(&[("a.crash", SAMPLE_REPORT), ("sub/b.txt", "x")]).unwrap();
        assert!(dir.path().join("a.crash").is_file());
        assert!(dir.path().join("sub/b.txt").is_file());
    }
}

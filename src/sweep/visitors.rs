use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::constants::ANNOTATION_FIELD;
use crate::packaging::PackageResolver;
use crate::report::CrashReport;
use crate::sweep::{ReportVisitor, SweepError};
use crate::upload::{ReportPersister, UploadOutcome};

const BULLET: &str = "\u{2022}";

/// Counters collected while uploading a directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub failed: usize,
    /// Entries that could not be read or parsed
    pub skipped: usize,
    /// Reports deleted after upload
    pub removed: usize,
    /// OOPS ids assigned by the server, in upload order
    pub oops_ids: Vec<String>,
}

impl UploadSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Uploads every visited report through a [`ReportPersister`].
///
/// With `cleanup` set a report file is removed once its upload succeeded.
/// Failed uploads always leave the file in place for a later attempt.
pub struct UploadVisitor<P, W> {
    persister: P,
    crash_dir: PathBuf,
    cleanup: bool,
    out: W,
    summary: UploadSummary,
}

impl<P, W> UploadVisitor<P, W>
where
    P: ReportPersister,
    W: Write + Send,
{
    pub fn new(persister: P, crash_dir: impl Into<PathBuf>, cleanup: bool, out: W) -> Self {
        UploadVisitor {
            persister,
            crash_dir: crash_dir.into(),
            cleanup,
            out,
            summary: UploadSummary::default(),
        }
    }

    pub fn summary(&self) -> &UploadSummary {
        &self.summary
    }

    pub fn into_summary(self) -> UploadSummary {
        self.summary
    }

    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "  {} {}", BULLET, line) {
            debug!("Failed to write upload progress: {}", e);
        }
    }

    async fn remove(&mut self, name: &str) {
        let path = self.crash_dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                self.summary.removed += 1;
            }
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

#[async_trait]
impl<P, W> ReportVisitor for UploadVisitor<P, W>
where
    P: ReportPersister,
    W: Write + Send,
{
    async fn on_report(&mut self, name: &str, report: CrashReport) {
        match self.persister.persist(&report).await {
            Ok(outcome) => {
                info!("Uploaded {}: {:?}", name, outcome);
                self.summary.uploaded += 1;
                if let Some(id) = outcome.oops_id() {
                    self.summary.oops_ids.push(id.to_string());
                }
                match &outcome {
                    UploadOutcome::OopsId(id) | UploadOutcome::CoreSubmitted(id) => {
                        self.emit(format_args!("{}: Successfully uploaded ({})", name, id))
                    }
                    _ => self.emit(format_args!("{}: Successfully uploaded", name)),
                }

                if self.cleanup {
                    self.remove(name).await;
                }
            }
            Err(e) => {
                warn!("Failed to upload {}: {}", name, e);
                self.summary.failed += 1;
                self.emit(format_args!("{}: Failed to upload crash report - {}", name, e));
            }
        }
    }

    fn on_error(&mut self, error: SweepError) {
        self.summary.skipped += 1;
        if let SweepError::DirectoryUnreadable { .. } = error {
            self.emit(format_args!("{}", error));
        }
    }
}

/// Prints one line per report to `out`.
///
/// ```text
///   • _usr_bin_foo.1000.crash[Crash]: /usr/bin/foo - no further details
/// ```
///
/// With a [`PackageResolver`] the owning package of the executable is
/// appended. Errors are skipped silently.
pub struct ListingVisitor<W> {
    out: W,
    resolver: Option<Box<dyn PackageResolver>>,
    listed: usize,
}

impl<W: Write + Send> ListingVisitor<W> {
    pub fn new(out: W) -> Self {
        ListingVisitor {
            out,
            resolver: None,
            listed: 0,
        }
    }

    pub fn with_resolver(mut self, resolver: Box<dyn PackageResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn listed(&self) -> usize {
        self.listed
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn package_of(&self, executable: &str) -> Option<String> {
        let resolver = self.resolver.as_ref()?;
        match resolver.resolve(executable) {
            Ok(bundles) => bundles
                .first()
                .map(|bundle| format!("{} {}", bundle.name, bundle.version)),
            Err(e) => {
                debug!("No package for {}: {}", executable, e);
                None
            }
        }
    }
}

#[async_trait]
impl<W: Write + Send> ReportVisitor for ListingVisitor<W> {
    async fn on_report(&mut self, name: &str, report: CrashReport) {
        let problem_type = report.first_non_empty("ProblemType").unwrap_or("unknown");
        let executable = report.first_non_empty("ExecutablePath");
        let annotation = report
            .first_non_empty(ANNOTATION_FIELD)
            .unwrap_or("no further details");

        let mut line = format!(
            "  {} {}[{}]: {} - {}",
            BULLET,
            name,
            problem_type,
            executable.unwrap_or("unknown executable"),
            annotation
        );
        if let Some(package) = executable.and_then(|path| self.package_of(path)) {
            line.push_str(&format!(" ({})", package));
        }

        if let Err(e) = writeln!(self.out, "{}", line) {
            debug!("Failed to write listing: {}", e);
        }
        self.listed += 1;
    }

    fn on_error(&mut self, _error: SweepError) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packaging::{Bundle, MockPackageResolver};
    use crate::upload::{MockReportPersister, UploadError};
    use std::fs;
    use tempfile::TempDir;

    fn report(executable: &str) -> CrashReport {
        vec![("ProblemType", "Crash"), ("ExecutablePath", executable)]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn test_upload_visitor_removes_uploaded_reports_on_cleanup() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.crash"), "ProblemType: Crash\n").unwrap();

        let mut persister = MockReportPersister::new();
        persister
            .expect_persist()
            .times(1)
            .returning(|_| Ok(UploadOutcome::OopsId("5f3e".to_string())));

        let mut visitor = UploadVisitor::new(persister, dir.path(), true, Vec::new());
        visitor.on_report("a.crash", report("/usr/bin/foo")).await;

        assert!(!dir.path().join("a.crash").exists());
        let summary = visitor.summary().clone();
        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.oops_ids, vec!["5f3e"]);
    }

    #[tokio::test]
    async fn test_upload_visitor_keeps_failed_reports() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.crash"), "ProblemType: Crash\n").unwrap();

        let mut persister = MockReportPersister::new();
        persister.expect_persist().times(1).returning(|_| {
            Err(UploadError::NotReachable {
                host: "daisy.ubuntu.com".to_string(),
            })
        });

        let mut visitor = UploadVisitor::new(persister, dir.path(), true, Vec::new());
        visitor.on_report("a.crash", report("/usr/bin/foo")).await;

        assert!(dir.path().join("a.crash").exists());
        assert_eq!(visitor.summary().failed, 1);
        assert!(!visitor.summary().is_clean());
    }

    #[tokio::test]
    async fn test_upload_visitor_without_cleanup_keeps_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.crash"), "ProblemType: Crash\n").unwrap();

        let mut persister = MockReportPersister::new();
        persister
            .expect_persist()
            .returning(|_| Ok(UploadOutcome::Accepted));

        let mut visitor = UploadVisitor::new(persister, dir.path(), false, Vec::new());
        visitor.on_report("a.crash", report("/usr/bin/foo")).await;
        visitor.on_error(SweepError::EmptyReport { name: "b.crash".to_string() });

        assert!(dir.path().join("a.crash").exists());
        let summary = visitor.into_summary();
        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.oops_ids.is_empty());
    }

    #[tokio::test]
    async fn test_listing_format() {
        let mut visitor = ListingVisitor::new(Vec::new());
        let mut annotated = report("/usr/bin/foo");
        annotated.push("Annotation", "disk full".to_string());

        visitor.on_report("a.crash", annotated).await;
        visitor.on_report("b.crash", CrashReport::new()).await;

        let output = String::from_utf8(visitor.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "  \u{2022} a.crash[Crash]: /usr/bin/foo - disk full");
        assert_eq!(
            lines[1],
            "  \u{2022} b.crash[unknown]: unknown executable - no further details"
        );
    }

    #[tokio::test]
    async fn test_listing_appends_owning_package() {
        let mut resolver = MockPackageResolver::new();
        resolver
            .expect_resolve()
            .withf(|pattern: &str| pattern == "/usr/bin/foo")
            .returning(|_| {
                Ok(vec![Bundle {
                    name: "foo".to_string(),
                    version: "1.2-3".to_string(),
                    architecture: "amd64".to_string(),
                }])
            });
        resolver
            .expect_resolve()
            .withf(|pattern: &str| pattern != "/usr/bin/foo")
            .returning(|_| Ok(Vec::new()));

        let mut visitor = ListingVisitor::new(Vec::new()).with_resolver(Box::new(resolver));
        visitor.on_report("a.crash", report("/usr/bin/foo")).await;
        visitor.on_report("b.crash", report("/opt/bar")).await;

        assert_eq!(visitor.listed(), 2);
        let output = String::from_utf8(visitor.into_inner()).unwrap();
        assert!(output.contains("a.crash[Crash]: /usr/bin/foo - no further details (foo 1.2-3)"));
        assert!(output.contains("b.crash[Crash]: /opt/bar - no further details\n"));
    }
}

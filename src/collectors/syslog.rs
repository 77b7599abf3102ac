use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use crate::collectors::{CollectError, Collector};
use crate::constants::SYSLOG_PATH;

/// Reads the whole system log file
#[derive(Debug, Clone)]
pub struct SyslogCollector {
    path: PathBuf,
}

impl Default for SyslogCollector {
    fn default() -> Self {
        SyslogCollector::new(SYSLOG_PATH)
    }
}

impl SyslogCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SyslogCollector { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Collector for SyslogCollector {
    fn name(&self) -> &'static str {
        "syslog"
    }

    async fn collect(&self) -> Result<Vec<u8>, CollectError> {
        let blob = tokio::fs::read(&self.path)
            .await
            .map_err(|source| CollectError::Io {
                facility: self.name(),
                path: self.path.clone(),
                source,
            })?;

        debug!("Collected {} bytes of syslog from {}", blob.len(), self.path.display());
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_collects_file_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("syslog");
        std::fs::write(&path, "Jan  1 00:00:00 host kernel: hello\n").unwrap();

        let blob = SyslogCollector::new(&path).collect().await.unwrap();

        assert_eq!(blob, b"Jan  1 00:00:00 host kernel: hello\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = SyslogCollector::new(dir.path().join("absent"))
            .collect()
            .await
            .unwrap_err();

        assert!(matches!(err, CollectError::Io { facility: "syslog", .. }));
    }
}

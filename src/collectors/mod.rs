//! Log collectors.
//!
//! A [`Collector`] snapshots one log facility into a blob of bytes that can
//! accompany a crash report:
//!
//! - [`SyslogCollector`]: the system log file
//! - [`KernelLogCollector`]: the kernel ring buffer read through `/dev/kmsg`

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Kernel ring buffer collector
pub mod kmsg;

/// System log file collector
pub mod syslog;

pub use kmsg::KernelLogCollector;
pub use syslog::SyslogCollector;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to collect {facility} from {}: {source}", path.display())]
    Io {
        facility: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("collection task failed: {0}")]
    Task(String),
}

/// Gathers the contents of a log facility
#[async_trait]
pub trait Collector: Send + Sync {
    /// Short name of the facility, used in log output
    fn name(&self) -> &'static str;

    async fn collect(&self) -> Result<Vec<u8>, CollectError>;
}

/// Collectors available on this system, in the order they should run
pub fn default_collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(KernelLogCollector::default()),
        Box::new(SyslogCollector::default()),
    ]
}

//! Mapping executables to the installed package that owns them.

use std::path::PathBuf;

use thiserror::Error;

use crate::report::ParseError;

/// dpkg database reader
pub mod dpkg;

pub use dpkg::DpkgResolver;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("failed to parse package database: {0}")]
    Parse(#[from] ParseError),

    #[error("no architecture recorded in {}", path.display())]
    MissingArchitecture { path: PathBuf },
}

/// An installed package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub version: String,
    pub architecture: String,
}

/// Resolves file patterns to the packages installing matching files
#[cfg_attr(test, mockall::automock)]
pub trait PackageResolver: Send + Sync {
    /// All installed packages owning a file that matches `pattern`.
    ///
    /// `*` and `?` match within a single path component.
    fn resolve(&self, pattern: &str) -> Result<Vec<Bundle>, PackageError>;
}

//! Device identity resolution.
//!
//! The agent tags core dump uploads with a stable, hashed device identity.
//! Raw hardware identifiers never leave the device: leaf sources produce
//! raw bytes, a chain tries them in a fixed order, the result is digested
//! with SHA-512 and the digest is cached on disk.
//!
//! ## Default composition
//!
//! ```text
//! Cached(Hashed(Chained[MAC address, product UUID, vendor serial]))
//! ```
//!
//! Once the cache file exists it is authoritative. The chain is never
//! consulted again, even if the hardware changes.
//!
//! ## Usage
//!
//! ```no_run
//! use crash_agent::config::IdentityConfig;
//! use crash_agent::identity::{default_identifier, Identifier};
//!
//! # fn example() -> anyhow::Result<()> {
//! let identifier = default_identifier(&IdentityConfig::default());
//! let identity = identifier.identify()?;
//! println!("{}", identity);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::{IdentityConfig, IdentitySource};

/// Ordered fallback over several identifiers
pub mod chain;

/// Persisting identifier backed by a cache file
pub mod cache;

/// Leaf identifiers reading hardware attributes
pub mod sources;

pub use cache::{CachingIdentifier, Resolution};
pub use chain::{ChainedIdentifier, HashingIdentifier};
pub use sources::{FileIdentifier, MacAddressIdentifier};

/// Opaque device identity.
///
/// For the default identifier this is always a SHA-512 digest.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity(Vec<u8>);

impl Identity {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex rendering used in upload URLs
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl From<Vec<u8>> for Identity {
    fn from(bytes: Vec<u8>) -> Self {
        Identity(bytes)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Raw identities may be hardware addresses, keep them out of debug logs.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({} bytes)", self.0.len())
    }
}

/// Errors raised while establishing the device identity
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A single source could not produce an identity. The chain recovers
    /// from this by moving on to the next source.
    #[error("identity source {origin} unavailable: {reason}")]
    SourceUnavailable { origin: String, reason: String },

    /// Every source of a chain failed.
    #[error("all {attempted} identity sources failed")]
    AllSourcesExhausted { attempted: usize },

    /// The identity was computed but could not be cached.
    #[error("failed to persist identity to {path}: {source}")]
    CacheWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The digest could not be computed over the inner identity.
    #[error("failed to hash identity: {0}")]
    HashFailed(String),
}

impl IdentityError {
    pub(crate) fn unavailable(origin: impl Into<String>, reason: impl fmt::Display) -> Self {
        IdentityError::SourceUnavailable {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Capability producing a device identity
#[cfg_attr(test, mockall::automock)]
pub trait Identifier: Send + Sync {
    /// Returns the identity or the reason it could not be established
    fn identify(&self) -> Result<Identity, IdentityError>;
}

impl<T: Identifier + ?Sized> Identifier for Box<T> {
    fn identify(&self) -> Result<Identity, IdentityError> {
        (**self).identify()
    }
}

impl<T: Identifier + ?Sized> Identifier for std::sync::Arc<T> {
    fn identify(&self) -> Result<Identity, IdentityError> {
        (**self).identify()
    }
}

/// Build a leaf identifier from its configuration
fn build_source(source: &IdentitySource) -> Box<dyn Identifier> {
    match source {
        IdentitySource::MacAddress { net_class_dir } => {
            Box::new(MacAddressIdentifier::new(net_class_dir.clone()))
        }
        IdentitySource::File { path } => Box::new(FileIdentifier::new(path.clone())),
    }
}

/// Set up the identifier used for tagging uploads.
///
/// Sources are tried in the configured order, their output is hashed and the
/// digest is cached at `config.cache_path`.
pub fn default_identifier(config: &IdentityConfig) -> CachingIdentifier {
    let sources = config.sources.iter().map(build_source).collect();
    let hashed = HashingIdentifier::new(ChainedIdentifier::new(sources));
    CachingIdentifier::new(Box::new(hashed), config.cache_path.clone())
}

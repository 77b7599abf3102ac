use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::identity::{Identifier, Identity, IdentityError};
use crate::utils::fs::write_atomically;

/// Outcome of a cache-aware identity lookup
#[derive(Debug)]
pub enum Resolution {
    /// The identity was loaded from the cache file
    Cached(Identity),
    /// The identity was computed by the wrapped identifier. `persist_error`
    /// is set if it could not be written to the cache.
    Fresh {
        identity: Identity,
        persist_error: Option<IdentityError>,
    },
}

impl Resolution {
    pub fn identity(&self) -> &Identity {
        match self {
            Resolution::Cached(identity) => identity,
            Resolution::Fresh { identity, .. } => identity,
        }
    }

    pub fn into_identity(self) -> Identity {
        match self {
            Resolution::Cached(identity) => identity,
            Resolution::Fresh { identity, .. } => identity,
        }
    }
}

/// Persists the identity of a wrapped identifier.
///
/// An existing cache file is authoritative: its contents are returned
/// verbatim and the wrapped identifier is not consulted. Otherwise the
/// wrapped identifier runs and its output is written atomically to the
/// cache path.
pub struct CachingIdentifier {
    inner: Box<dyn Identifier>,
    cache_path: PathBuf,
}

impl CachingIdentifier {
    pub fn new(inner: Box<dyn Identifier>, cache_path: impl Into<PathBuf>) -> Self {
        CachingIdentifier {
            inner,
            cache_path: cache_path.into(),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    fn load(&self) -> Option<Identity> {
        match fs::read(&self.cache_path) {
            Ok(bytes) if bytes.is_empty() => {
                warn!("Ignoring empty identity cache {}", self.cache_path.display());
                None
            }
            Ok(bytes) => Some(Identity::from(bytes)),
            Err(e) => {
                debug!("No usable identity cache at {}: {}", self.cache_path.display(), e);
                None
            }
        }
    }

    /// Resolve the identity, reporting where it came from
    pub fn resolve(&self) -> Result<Resolution, IdentityError> {
        if let Some(identity) = self.load() {
            debug!("Loaded identity from {}", self.cache_path.display());
            return Ok(Resolution::Cached(identity));
        }

        let identity = self.inner.identify()?;

        let persist_error = write_atomically(&self.cache_path, identity.as_bytes())
            .err()
            .map(|source| IdentityError::CacheWriteFailed {
                path: self.cache_path.clone(),
                source,
            });

        Ok(Resolution::Fresh { identity, persist_error })
    }
}

impl Identifier for CachingIdentifier {
    fn identify(&self) -> Result<Identity, IdentityError> {
        let resolution = self.resolve()?;

        if let Resolution::Fresh { persist_error: Some(e), .. } = &resolution {
            warn!("{}", e);
        }

        Ok(resolution.into_identity())
    }
}

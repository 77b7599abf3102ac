use log::debug;

use crate::identity::{Identifier, Identity, IdentityError};
use crate::utils::hash::sha512;

/// Tries identifiers in a fixed order; the first success wins.
///
/// The order is set at construction and never changes. Failures of
/// individual sources are logged and swallowed; only exhausting every
/// source is an error.
pub struct ChainedIdentifier {
    sources: Vec<Box<dyn Identifier>>,
}

impl ChainedIdentifier {
    pub fn new(sources: Vec<Box<dyn Identifier>>) -> Self {
        ChainedIdentifier { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Identifier for ChainedIdentifier {
    fn identify(&self) -> Result<Identity, IdentityError> {
        for (index, source) in self.sources.iter().enumerate() {
            match source.identify() {
                Ok(identity) => {
                    debug!("Identity source #{} succeeded", index);
                    return Ok(identity);
                }
                Err(e) => debug!("Identity source #{} failed: {}", index, e),
            }
        }

        Err(IdentityError::AllSourcesExhausted { attempted: self.sources.len() })
    }
}

/// Replaces the output of an inner identifier with its SHA-512 digest.
pub struct HashingIdentifier<I> {
    inner: I,
}

impl<I: Identifier> HashingIdentifier<I> {
    pub fn new(inner: I) -> Self {
        HashingIdentifier { inner }
    }
}

impl<I: Identifier> Identifier for HashingIdentifier<I> {
    fn identify(&self) -> Result<Identity, IdentityError> {
        let raw = self.inner.identify()?;

        // Every device would share the digest of nothing.
        if raw.is_empty() {
            return Err(IdentityError::HashFailed("inner identity is empty".to_string()));
        }

        Ok(Identity::from(sha512(raw.as_bytes())))
    }
}

//! Utility functions shared by the identity and upload paths.
//!
//! ## Components
//!
//! - **Hashing**: SHA-512 digests for device identities
//! - **Filesystem**: crash-safe file replacement (write temp, rename)

/// Cryptographic hash calculation utilities
pub mod hash;

/// Atomic file writes
pub mod fs;

//! Integration tests for device identity resolution.

use std::fs;

use anyhow::Result;
use tempfile::TempDir;

use crash_agent::config::{IdentityConfig, IdentitySource};
use crash_agent::identity::{default_identifier, Identifier, IdentityError, Resolution};
use crash_agent::utils::hash::{sha512, sha512_hex, SHA512_LEN};

fn file_sources(dir: &TempDir, contents: &[(&str, &str)]) -> Result<Vec<IdentitySource>> {
    let mut sources = Vec::new();
    for (name, content) in contents {
        let path = dir.path().join(name);
        fs::write(&path, content)?;
        sources.push(IdentitySource::File { path });
    }
    Ok(sources)
}

#[test]
fn test_first_identity_is_cached_verbatim() -> Result<()> {
    let dir = TempDir::new()?;
    let config = IdentityConfig {
        cache_path: dir.path().join("var/lib/whoopsie/whoopsie-id"),
        sources: file_sources(&dir, &[("product_uuid", "4c4c4544-0042-3510")])?,
    };

    let identity = default_identifier(&config).identify()?;

    assert_eq!(identity.as_bytes().len(), SHA512_LEN);
    assert_eq!(identity.as_bytes(), sha512(b"4c4c4544-0042-3510").as_slice());
    assert_eq!(fs::read(&config.cache_path)?, identity.as_bytes());
    Ok(())
}

#[test]
fn test_cached_identity_wins_over_sources() -> Result<()> {
    let dir = TempDir::new()?;
    let cache_path = dir.path().join("whoopsie-id");
    fs::write(&cache_path, b"previously cached digest")?;

    // No source could produce anything.
    let config = IdentityConfig {
        cache_path: cache_path.clone(),
        sources: vec![IdentitySource::File { path: dir.path().join("absent") }],
    };
    let identifier = default_identifier(&config);

    for _ in 0..3 {
        assert_eq!(identifier.identify()?.as_bytes(), b"previously cached digest");
    }
    assert!(matches!(identifier.resolve()?, Resolution::Cached(_)));
    Ok(())
}

#[test]
fn test_primary_source_takes_precedence() -> Result<()> {
    let dir = TempDir::new()?;
    let config = IdentityConfig {
        cache_path: dir.path().join("whoopsie-id"),
        sources: file_sources(&dir, &[("primary", "aa:bb:cc:dd:ee:ff"), ("secondary", "serial-1234")])?,
    };

    let identity = default_identifier(&config).identify()?;

    assert_eq!(identity.as_bytes(), sha512(b"aa:bb:cc:dd:ee:ff").as_slice());
    Ok(())
}

#[test]
fn test_fallback_to_later_source() -> Result<()> {
    let dir = TempDir::new()?;
    let mut sources = vec![IdentitySource::MacAddress {
        net_class_dir: dir.path().join("no-net"),
    }];
    sources.extend(file_sources(&dir, &[("empty", "  \n"), ("serial", "serial-1234")])?);

    let config = IdentityConfig {
        cache_path: dir.path().join("whoopsie-id"),
        sources,
    };

    let identity = default_identifier(&config).identify()?;

    assert_eq!(identity.to_hex(), sha512_hex(b"serial-1234"));
    Ok(())
}

#[test]
fn test_exhausted_chain_writes_no_cache() -> Result<()> {
    let dir = TempDir::new()?;
    let config = IdentityConfig {
        cache_path: dir.path().join("whoopsie-id"),
        sources: vec![IdentitySource::File { path: dir.path().join("absent") }],
    };

    let err = default_identifier(&config).identify().unwrap_err();

    assert!(matches!(err, IdentityError::AllSourcesExhausted { attempted: 1 }));
    assert!(!config.cache_path.exists());
    Ok(())
}

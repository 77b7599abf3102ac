use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::constants::{ARPHRD_ETHER, SYS_CLASS_NET};
use crate::identity::{Identifier, Identity, IdentityError};

/// Reads an identity from a single file, e.g. the DMI product UUID.
#[derive(Debug, Clone)]
pub struct FileIdentifier {
    path: PathBuf,
}

impl FileIdentifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileIdentifier { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Identifier for FileIdentifier {
    fn identify(&self) -> Result<Identity, IdentityError> {
        let origin = self.path.display().to_string();
        let bytes = fs::read(&self.path).map_err(|e| IdentityError::unavailable(&origin, e))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(IdentityError::unavailable(origin, "file is empty"));
        }

        Ok(Identity::from(bytes))
    }
}

/// Uses the hardware address of the first Ethernet interface.
///
/// Interfaces are visited in name order so the choice is stable across
/// boots. Interfaces reporting an all-zero address are skipped.
#[derive(Debug, Clone)]
pub struct MacAddressIdentifier {
    net_class_dir: PathBuf,
}

impl MacAddressIdentifier {
    pub fn new(net_class_dir: impl Into<PathBuf>) -> Self {
        MacAddressIdentifier { net_class_dir: net_class_dir.into() }
    }

    /// Read the address of `interface` if it is an Ethernet device
    fn ethernet_address(interface: &Path) -> Option<String> {
        let device_type = fs::read_to_string(interface.join("type")).ok()?;
        if device_type.trim().parse::<i32>().ok()? != ARPHRD_ETHER {
            return None;
        }

        let address = fs::read_to_string(interface.join("address")).ok()?;
        let address = address.trim();
        if address.is_empty() || address.chars().all(|c| c == '0' || c == ':') {
            return None;
        }

        Some(address.to_string())
    }
}

impl Default for MacAddressIdentifier {
    fn default() -> Self {
        MacAddressIdentifier::new(SYS_CLASS_NET)
    }
}

impl Identifier for MacAddressIdentifier {
    fn identify(&self) -> Result<Identity, IdentityError> {
        let origin = self.net_class_dir.display().to_string();
        let entries = fs::read_dir(&self.net_class_dir)
            .map_err(|e| IdentityError::unavailable(&origin, e))?;

        let mut interfaces: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        interfaces.sort();

        for interface in interfaces {
            if let Some(address) = Self::ethernet_address(&interface) {
                debug!("Using hardware address of {}", interface.display());
                return Ok(Identity::from(address.into_bytes()));
            }
        }

        Err(IdentityError::unavailable(origin, "no ethernet interface found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn add_interface(root: &Path, name: &str, device_type: &str, address: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("type"), format!("{}\n", device_type)).unwrap();
        fs::write(dir.join("address"), format!("{}\n", address)).unwrap();
    }

    #[test]
    fn test_file_identifier_reads_configured_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("product_uuid");
        fs::write(&path, 42u64.to_le_bytes()).unwrap();

        let identity = FileIdentifier::new(&path).identify().unwrap();

        assert_eq!(identity.as_bytes(), &42u64.to_le_bytes());
    }

    #[test]
    fn test_file_identifier_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = FileIdentifier::new(dir.path().join("missing")).identify().unwrap_err();
        assert!(matches!(err, IdentityError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_file_identifier_rejects_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("iSerial");
        fs::write(&path, b"\n").unwrap();

        let err = FileIdentifier::new(&path).identify().unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_mac_identifier_picks_first_ethernet_interface() {
        let dir = TempDir::new().unwrap();
        add_interface(dir.path(), "lo", "772", "00:00:00:00:00:00");
        add_interface(dir.path(), "wlan0", "1", "aa:bb:cc:dd:ee:02");
        add_interface(dir.path(), "eth0", "1", "aa:bb:cc:dd:ee:01");

        let identity = MacAddressIdentifier::new(dir.path()).identify().unwrap();

        assert_eq!(identity.as_bytes(), b"aa:bb:cc:dd:ee:01");
    }

    #[test]
    fn test_mac_identifier_skips_zero_addresses_and_non_ethernet() {
        let dir = TempDir::new().unwrap();
        add_interface(dir.path(), "dummy0", "1", "00:00:00:00:00:00");
        add_interface(dir.path(), "ppp0", "512", "");

        let err = MacAddressIdentifier::new(dir.path()).identify().unwrap_err();
        assert!(err.to_string().contains("no ethernet interface"));
    }

    #[test]
    fn test_mac_identifier_reports_unreadable_directory() {
        let dir = TempDir::new().unwrap();
        let err = MacAddressIdentifier::new(dir.path().join("absent")).identify().unwrap_err();
        assert!(matches!(err, IdentityError::SourceUnavailable { .. }));
    }
}

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use crate::collectors::{CollectError, Collector};
use crate::constants::{KMSG_PATH, KMSG_RECORD_SIZE};

/// Reads the kernel ring buffer through `/dev/kmsg`.
///
/// The device is opened non-blocking so collection stops at the newest
/// record instead of waiting for new messages. Every record is rendered
/// the way `dmesg` prints it, `[seconds.micros] message`.
#[derive(Debug, Clone)]
pub struct KernelLogCollector {
    device: PathBuf,
}

impl Default for KernelLogCollector {
    fn default() -> Self {
        KernelLogCollector::new(KMSG_PATH)
    }
}

impl KernelLogCollector {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        KernelLogCollector {
            device: device.into(),
        }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }
}

#[async_trait]
impl Collector for KernelLogCollector {
    fn name(&self) -> &'static str {
        "kernel log"
    }

    async fn collect(&self) -> Result<Vec<u8>, CollectError> {
        let device = self.device.clone();
        let facility = self.name();

        let blob = tokio::task::spawn_blocking(move || read_device(device, facility))
            .await
            .map_err(|e| CollectError::Task(e.to_string()))??;

        debug!("Collected {} bytes of kernel log", blob.len());
        Ok(blob)
    }
}

#[cfg(unix)]
fn read_device(device: PathBuf, facility: &'static str) -> Result<Vec<u8>, CollectError> {
    use std::os::unix::fs::OpenOptionsExt;

    std::fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(&device)
        .and_then(read_records)
        .map_err(|source| CollectError::Io {
            facility,
            path: device,
            source,
        })
}

#[cfg(not(unix))]
fn read_device(_device: PathBuf, facility: &'static str) -> Result<Vec<u8>, CollectError> {
    Err(CollectError::Unsupported(facility))
}

/// Drain `reader` one record per read until it would block.
#[cfg_attr(not(unix), allow(dead_code))]
fn read_records<R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; KMSG_RECORD_SIZE];
    let mut out = Vec::new();

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let record = String::from_utf8_lossy(&buf[..n]);
                if let Some(line) = format_record(&record) {
                    out.extend_from_slice(line.as_bytes());
                    out.push(b'\n');
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            // The record was overwritten while we were reading, move on.
            Err(e) if e.raw_os_error() == Some(libc::EPIPE) => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(out)
}

/// `6,1234,5678901,-;message` -> `[    5.678901] message`
///
/// Continuation lines carrying device properties are dropped.
fn format_record(record: &str) -> Option<String> {
    let (header, body) = record.split_once(';')?;
    let timestamp: u64 = header.split(',').nth(2)?.trim().parse().ok()?;
    let message = body.lines().next().unwrap_or_default();

    Some(format!(
        "[{:5}.{:06}] {}",
        timestamp / 1_000_000,
        timestamp % 1_000_000,
        message
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Yields one record per read, like the kmsg device
    struct Records(VecDeque<io::Result<Vec<u8>>>);

    impl Read for Records {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(record)) => {
                    buf[..record.len()].copy_from_slice(&record);
                    Ok(record.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            }
        }
    }

    #[test]
    fn test_format_record() {
        assert_eq!(
            format_record("6,339,5140900,-;NET: Registered protocol family 10\n").unwrap(),
            "[    5.140900] NET: Registered protocol family 10"
        );
        assert_eq!(
            format_record("3,2,12345678,-,caller=T1;usb 1-1: device not accepting address\n SUBSYSTEM=usb\n")
                .unwrap(),
            "[   12.345678] usb 1-1: device not accepting address"
        );
        assert!(format_record("garbage").is_none());
        assert!(format_record("6,1,notanumber,-;x").is_none());
    }

    #[test]
    fn test_reads_until_would_block() {
        let reader = Records(VecDeque::from(vec![
            Ok(b"6,1,1000000,-;first\n".to_vec()),
            Err(io::Error::from_raw_os_error(libc::EPIPE)),
            Ok(b"6,2,2000001,-;second\n".to_vec()),
        ]));

        let blob = read_records(reader).unwrap();

        assert_eq!(
            String::from_utf8(blob).unwrap(),
            "[    1.000000] first\n[    2.000001] second\n"
        );
    }

    #[test]
    fn test_other_errors_are_returned() {
        let reader = Records(VecDeque::from(vec![Err(io::Error::from(
            io::ErrorKind::PermissionDenied,
        ))]));

        assert_eq!(
            read_records(reader).unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
    }

    #[cfg(not(unix))]
    #[tokio::test]
    async fn test_kernel_log_is_unsupported() {
        let err = KernelLogCollector::default().collect().await.unwrap_err();
        assert!(matches!(err, CollectError::Unsupported("kernel log")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_device_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = KernelLogCollector::new(dir.path().join("kmsg"))
            .collect()
            .await
            .unwrap_err();

        assert!(matches!(err, CollectError::Io { facility: "kernel log", .. }));
    }
}

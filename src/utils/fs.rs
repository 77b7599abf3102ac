use std::fs;
use std::io::{self, Write};
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

/// Replace the contents of `path` with `data` without ever exposing a partial file.
///
/// The data is written to a temporary file in the same directory, flushed to
/// disk and then renamed over `path`. Readers observe either the old contents
/// or the new contents. Concurrent writers race benignly: the last rename wins.
pub fn write_atomically(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!("Atomically wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

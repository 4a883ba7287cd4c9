//! Atomic output file writing
//!
//! Export output is written to a temporary file next to the destination and
//! renamed into place once complete, so a failed export never leaves a
//! half-written file behind.

use crate::error::{Error, Result};
use log::debug;
use std::io::{self, Write};
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

const TEMP_PREFIX: &str = ".mdpress-";

/// Write `bytes` to `destination`, replacing any existing file.
///
/// # Errors
///
/// Returns `Error::FileWriteFailed` if the directory is missing or
/// unwritable, the disk fills up, or the final rename fails. The temporary
/// file is removed in every failure case.
pub fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<()> {
    let write_failed = |source| Error::FileWriteFailed {
        path: destination.to_path_buf(),
        source,
    };

    let parent = match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = create_output_file(parent, destination).map_err(write_failed)?;
    temp.write_all(bytes).map_err(write_failed)?;
    temp.as_file().sync_all().map_err(write_failed)?;
    temp.persist(destination)
        .map_err(|e| write_failed(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), destination.display());
    Ok(())
}

/// Temp file that ends up with the permissions a plain create would give.
///
/// New files get 0o666 less the umask. A replaced file keeps its mode.
#[cfg(unix)]
fn create_output_file(dir: &Path, destination: &Path) -> io::Result<NamedTempFile> {
    use std::fs::{self, Permissions};
    use std::os::unix::fs::PermissionsExt;

    let temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .permissions(Permissions::from_mode(0o666))
        .tempfile_in(dir)?;

    match fs::metadata(destination) {
        Ok(meta) if meta.is_file() => temp.as_file().set_permissions(meta.permissions())?,
        _ => {}
    }
    Ok(temp)
}

#[cfg(not(unix))]
fn create_output_file(dir: &Path, _destination: &Path) -> io::Result<NamedTempFile> {
    Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)
}

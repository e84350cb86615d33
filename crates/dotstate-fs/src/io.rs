//! Atomic, permission-preserving file I/O

use std::fs::{self, Permissions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::{Error, Result};

const TEMP_PREFIX: &str = ".";
const TEMP_SUFFIX: &str = ".tmp";

/// Write content atomically to a file with an exact mode.
///
/// Writes to a hidden temp file in the same directory (so the rename stays on
/// one filesystem), applies `mode` regardless of the process umask, syncs,
/// and renames over `path`. Readers of `path` observe either the old content
/// or the new content, never a partial write. The temp file name has a fixed
/// length and is removed if any step fails. The parent directory must
/// already exist.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8], mode: u32) -> Result<()> {
    let path = path.as_ref();
    let parent = temp_dir_for(path)?;

    let mut temp_file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)
        .map_err(|e| Error::io(path, e))?;
    let temp_path = temp_file.path().to_path_buf();

    // The temp file is created 0600; the target mode must be exact
    temp_file
        .as_file()
        .set_permissions(Permissions::from_mode(mode))
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .write_all(contents)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .persist(path)
        .map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// Directory the temp file for `path` is created in.
fn temp_dir_for(path: &Path) -> Result<&Path> {
    if path.file_name().is_none() {
        return Err(Error::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        ));
    }
    Ok(match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    })
}

/// Read the full content of a file.
pub fn read_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| Error::io(path, e))
}

/// Read text content from a file.
pub fn read_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

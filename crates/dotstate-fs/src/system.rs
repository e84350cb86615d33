//! Filesystem handle used to converge a target tree
//!
//! The reconciler only touches the target through [`System`], so callers can
//! wrap the real filesystem (to record or veto mutations) without changing
//! the convergence algorithm.

use std::fs::{self, DirBuilder, Metadata, Permissions};
use std::io::ErrorKind;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;

use crate::{Error, Result, io};

/// Permission bits compared and applied by the reconciler.
pub const PERMISSION_BITS: u32 = 0o777;

/// Extract the permission bits from entry metadata.
pub fn permission_bits(metadata: &Metadata) -> u32 {
    metadata.permissions().mode() & PERMISSION_BITS
}

/// Operations the reconciler needs from a filesystem.
pub trait System {
    /// Stat `path` without following a final symlink.
    ///
    /// Returns `Ok(None)` when nothing exists at `path`.
    fn metadata(&self, path: &Path) -> Result<Option<Metadata>>;

    /// Read the full content of the file at `path`.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create a single directory with exactly `mode`.
    fn create_dir(&self, path: &Path, mode: u32) -> Result<()>;

    /// Set the permission bits of `path` to exactly `mode`.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;

    /// Remove whatever exists at `path`, including a whole directory subtree.
    fn remove_all(&self, path: &Path) -> Result<()>;

    /// Replace the file at `path` with `contents` and exactly `mode`.
    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()>;
}

/// [`System`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealSystem;

impl RealSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for RealSystem {
    fn metadata(&self, path: &Path) -> Result<Option<Metadata>> {
        match fs::symlink_metadata(path) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        io::read_bytes(path)
    }

    fn create_dir(&self, path: &Path, mode: u32) -> Result<()> {
        DirBuilder::new()
            .mode(mode)
            .create(path)
            .map_err(|e| Error::io(path, e))?;
        // mkdir(2) honours the umask
        self.set_permissions(path, mode)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        fs::set_permissions(path, Permissions::from_mode(mode)).map_err(|e| Error::io(path, e))
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let Some(metadata) = self.metadata(path)? else {
            return Ok(());
        };
        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| Error::io(path, e))
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        io::write_atomic(path, contents, mode)
    }
}

//! [`RecordingSystem`]: the real filesystem, with every mutation recorded.

use std::cell::RefCell;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use dotstate_fs::{RealSystem, Result, System};

/// A mutating call made through [`RecordingSystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateDir(PathBuf, u32),
    SetPermissions(PathBuf, u32),
    RemoveAll(PathBuf),
    WriteFile(PathBuf, u32),
}

/// Delegates to [`RealSystem`] and records mutating calls and reads.
#[derive(Debug, Default)]
pub struct RecordingSystem {
    inner: RealSystem,
    calls: RefCell<Vec<Call>>,
    reads: RefCell<Vec<PathBuf>>,
}

impl RecordingSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutating calls so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Paths read so far, in order.
    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.borrow().clone()
    }

    /// Forget all recorded calls.
    pub fn reset(&self) {
        self.calls.borrow_mut().clear();
        self.reads.borrow_mut().clear();
    }
}

impl System for RecordingSystem {
    fn metadata(&self, path: &Path) -> Result<Option<Metadata>> {
        self.inner.metadata(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.reads.borrow_mut().push(path.to_path_buf());
        self.inner.read(path)
    }

    fn create_dir(&self, path: &Path, mode: u32) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::CreateDir(path.to_path_buf(), mode));
        self.inner.create_dir(path, mode)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::SetPermissions(path.to_path_buf(), mode));
        self.inner.set_permissions(path, mode)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::RemoveAll(path.to_path_buf()));
        self.inner.remove_all(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::WriteFile(path.to_path_buf(), mode));
        self.inner.write_file(path, contents, mode)
    }
}

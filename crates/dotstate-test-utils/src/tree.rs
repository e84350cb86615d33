//! [`TestTree`] builder for source and target tree scenarios.

use std::fs::{self, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory with helpers for creating entries with exact modes
/// and asserting on them.
///
/// # Example
///
/// ```rust,no_run
/// use dotstate_test_utils::TestTree;
///
/// let source = TestTree::new();
/// source.dir("private_dot_ssh", 0o755);
/// source.file("private_dot_ssh/config", "Host *\n", 0o644);
/// source.assert_dir("private_dot_ssh", 0o755);
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `rel` inside the tree.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Create directory `rel` (and missing parents) with exactly `mode`.
    pub fn dir(&self, rel: &str, mode: u32) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(&path)
            .unwrap_or_else(|e| panic!("TestTree::dir: {}: {e}", path.display()));
        set_mode(&path, mode);
        path
    }

    /// Write file `rel` with exactly `mode`, creating missing parents.
    pub fn file(&self, rel: &str, contents: impl AsRef<[u8]>, mode: u32) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("TestTree::file: {}: {e}", parent.display()));
        }
        fs::write(&path, contents)
            .unwrap_or_else(|e| panic!("TestTree::file: {}: {e}", path.display()));
        set_mode(&path, mode);
        path
    }

    /// Create a symlink at `rel` pointing to `target`.
    pub fn symlink(&self, rel: &str, target: &str) -> PathBuf {
        let path = self.path(rel);
        std::os::unix::fs::symlink(target, &path)
            .unwrap_or_else(|e| panic!("TestTree::symlink: {}: {e}", path.display()));
        path
    }

    /// Permission bits of `rel`, not following a final symlink.
    pub fn mode(&self, rel: &str) -> u32 {
        let path = self.path(rel);
        let metadata = fs::symlink_metadata(&path)
            .unwrap_or_else(|e| panic!("TestTree::mode: {}: {e}", path.display()));
        metadata.permissions().mode() & 0o777
    }

    /// Read `rel` as bytes.
    pub fn read(&self, rel: &str) -> Vec<u8> {
        let path = self.path(rel);
        fs::read(&path).unwrap_or_else(|e| panic!("TestTree::read: {}: {e}", path.display()))
    }

    /// Assert that `rel` is a regular file with `contents` and `mode`.
    ///
    /// # Panics
    /// Panics with a descriptive message on any mismatch.
    pub fn assert_file(&self, rel: &str, contents: impl AsRef<[u8]>, mode: u32) {
        let path = self.path(rel);
        assert!(
            fs::symlink_metadata(&path).is_ok_and(|m| m.is_file()),
            "Expected regular file: {}",
            path.display()
        );
        assert_eq!(
            self.read(rel),
            contents.as_ref(),
            "Contents differ: {}",
            path.display()
        );
        assert_eq!(
            self.mode(rel),
            mode,
            "Mode differs: {} has {:o}, expected {:o}",
            path.display(),
            self.mode(rel),
            mode
        );
    }

    /// Assert that `rel` is a directory with `mode`.
    pub fn assert_dir(&self, rel: &str, mode: u32) {
        let path = self.path(rel);
        assert!(
            fs::symlink_metadata(&path).is_ok_and(|m| m.is_dir()),
            "Expected directory: {}",
            path.display()
        );
        assert_eq!(
            self.mode(rel),
            mode,
            "Mode differs: {} has {:o}, expected {:o}",
            path.display(),
            self.mode(rel),
            mode
        );
    }

    /// Assert that nothing exists at `rel`.
    pub fn assert_missing(&self, rel: &str) {
        let path = self.path(rel);
        assert!(
            fs::symlink_metadata(&path).is_err(),
            "Expected nothing at: {}",
            path.display()
        );
    }
}

fn set_mode(path: &Path, mode: u32) {
    fs::set_permissions(path, Permissions::from_mode(mode))
        .unwrap_or_else(|e| panic!("set_mode: {}: {e}", path.display()));
}

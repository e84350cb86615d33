//! Normalized relative paths for source and target names

use std::path::{Component, Path, PathBuf};

/// A `/`-separated path stored as UTF-8.
///
/// Source names and target lookups use this form. `/` is the only
/// separator; every other character, `\` included, is part of a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Create a NormalizedPath from any path-like input, unchanged.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: path.as_ref().to_string_lossy().into_owned(),
        }
    }

    /// Build a relative path from already-decoded segments.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let inner = segments
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("/");
        Self { inner }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Split into non-empty segments.
    ///
    /// Leading, trailing and repeated separators produce no segments, so
    /// `/a//b/` splits into `["a", "b"]`.
    pub fn segments(&self) -> Vec<&str> {
        self.inner.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 {
                None
            } else {
                Some(&name[idx + 1..])
            }
        })
    }
}

/// Split a native relative path into UTF-8 segments.
///
/// Returns `None` if any component is not valid UTF-8 or is not a plain
/// name (`..`, a root or a prefix). `.` components are skipped.
pub fn utf8_segments(path: &Path) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(segments)
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

//! Target state model
//!
//! A [`RootState`] is built once per invocation and owns its whole tree:
//! every [`DirState`] owns its children by value, so the model has no shared
//! nodes and no cycles. Child maps are unordered; every traversal with an
//! observable order goes through [`sorted_names`].

use std::collections::HashMap;

use dotstate_fs::NormalizedPath;

pub type DirMap = HashMap<String, DirState>;
pub type FileMap = HashMap<String, FileState>;

/// Desired state of a regular target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    /// Path of the originating entry, relative to the source root.
    pub source_name: NormalizedPath,
    /// Permission bits.
    pub mode: u32,
    /// Final contents, after any template expansion.
    pub contents: Vec<u8>,
}

impl FileState {
    pub fn new(
        source_name: impl Into<NormalizedPath>,
        mode: u32,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            mode,
            contents: contents.into(),
        }
    }
}

/// Desired state of a target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirState {
    pub source_name: NormalizedPath,
    pub mode: u32,
    pub dirs: DirMap,
    pub files: FileMap,
}

impl DirState {
    pub fn new(source_name: impl Into<NormalizedPath>, mode: u32) -> Self {
        Self {
            source_name: source_name.into(),
            mode,
            dirs: DirMap::new(),
            files: FileMap::new(),
        }
    }

    /// Add a file, replacing any file with the same target name.
    pub fn with_file(mut self, name: impl Into<String>, file: FileState) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    /// Add a subdirectory, replacing any directory with the same target name.
    pub fn with_dir(mut self, name: impl Into<String>, dir: DirState) -> Self {
        self.dirs.insert(name.into(), dir);
        self
    }

    /// Number of files in this directory and all subdirectories.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.dirs.values().map(DirState::file_count).sum::<usize>()
    }
}

/// Desired state of the whole target tree.
///
/// The root itself has no name or mode: it is the target directory, which is
/// expected to exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootState {
    pub dirs: DirMap,
    pub files: FileMap,
}

impl RootState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, file: FileState) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    pub fn with_dir(mut self, name: impl Into<String>, dir: DirState) -> Self {
        self.dirs.insert(name.into(), dir);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }

    /// Number of files in the whole tree.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.dirs.values().map(DirState::file_count).sum::<usize>()
    }

    /// Find the file state that produces `target_path`.
    ///
    /// `target_path` is relative to the target directory. Every segment but
    /// the last must name a directory in the model. A miss is `None`, never
    /// an error.
    pub fn find_source_file(&self, target_path: &str) -> Option<&FileState> {
        let path = NormalizedPath::new(target_path);
        let segments = path.segments();
        let (file_name, dir_names) = segments.split_last()?;

        let (mut dirs, mut files) = (&self.dirs, &self.files);
        for dir_name in dir_names {
            let dir = dirs.get(*dir_name)?;
            dirs = &dir.dirs;
            files = &dir.files;
        }
        files.get(*file_name)
    }

    /// Child maps of the directory reached by `dir_names`, or `None` if any
    /// of them is missing from the model.
    pub(crate) fn children_mut<S: AsRef<str>>(
        &mut self,
        dir_names: &[S],
    ) -> Option<(&mut DirMap, &mut FileMap)> {
        let (mut dirs, mut files) = (&mut self.dirs, &mut self.files);
        for dir_name in dir_names {
            let dir = dirs.get_mut(dir_name.as_ref())?;
            dirs = &mut dir.dirs;
            files = &mut dir.files;
        }
        Some((dirs, files))
    }
}

/// Keys of `map` in lexicographic order.
pub fn sorted_names<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

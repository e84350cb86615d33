//! Loading the source tree into a [`RootState`], and adding target files to it

use std::fs;
use std::path::{Path, PathBuf};

use dotstate_fs::path::utf8_segments;
use dotstate_fs::{NormalizedPath, io, permission_bits};
use serde_json::Value;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::attr::{decode_dir_name, decode_file_name, encode_dir_name, encode_file_name};
use crate::state::{DirMap, DirState, FileMap, FileState, RootState};
use crate::template::TemplateEngine;
use crate::{Error, Result};

/// Mode for files created in the source tree by [`SourceTree::add`].
const SOURCE_FILE_MODE: u32 = 0o644;

/// A source directory whose entry names encode the target state.
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: PathBuf,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the target state described by this source tree.
    ///
    /// Templates are rendered with `engine` against `data`. The first error
    /// aborts the whole load.
    pub fn load(&self, engine: &dyn TemplateEngine, data: &Value) -> Result<RootState> {
        let mut state = RootState::new();
        state.populate(&self.root, engine, data)?;
        info!(
            source = %self.root.display(),
            files = state.file_count(),
            "Loaded source state"
        );
        Ok(state)
    }

    /// Add an existing target file to the source tree.
    ///
    /// Each directory between `target_dir` and the file is encoded with its
    /// current mode, the file name with the file's current mode and
    /// `is_template`. Missing source directories are created. Returns the
    /// path of the written source file.
    pub fn add(&self, target_dir: &Path, target_path: &Path, is_template: bool) -> Result<PathBuf> {
        let target_path = if target_path.is_absolute() {
            target_path.to_path_buf()
        } else {
            target_dir.join(target_path)
        };
        let relative = target_path
            .strip_prefix(target_dir)
            .map_err(|_| Error::NotUnderTarget {
                path: target_path.clone(),
                target: target_dir.to_path_buf(),
            })?;
        let segments = utf8_segments(relative).ok_or_else(|| Error::InvalidSourceName {
            path: target_path.clone(),
        })?;
        let Some((file_name, dir_names)) = segments.split_last() else {
            return Err(Error::NotUnderTarget {
                path: target_path.clone(),
                target: target_dir.to_path_buf(),
            });
        };

        let metadata = stat(&target_path)?;
        if !metadata.is_file() {
            return Err(Error::UnsupportedFileType {
                path: target_path.clone(),
            });
        }

        let mut source_dir = self.root.clone();
        let mut target_cursor = target_dir.to_path_buf();
        for dir_name in dir_names {
            target_cursor.push(dir_name);
            let dir_metadata = stat(&target_cursor)?;
            source_dir.push(encode_dir_name(dir_name, permission_bits(&dir_metadata)));
        }
        fs::create_dir_all(&source_dir).map_err(|e| dotstate_fs::Error::io(&source_dir, e))?;

        let contents = io::read_bytes(&target_path)?;
        let source_path = source_dir.join(encode_file_name(
            file_name,
            permission_bits(&metadata),
            is_template,
        ));
        io::write_atomic(&source_path, &contents, SOURCE_FILE_MODE)?;

        info!(
            target = %target_path.display(),
            source = %source_path.display(),
            "Added file to source state"
        );
        Ok(source_path)
    }
}

impl RootState {
    /// Walk `source_dir` and add every entry it describes to this state.
    ///
    /// Directories are registered before their contents. Entries whose name
    /// starts with `.` are not part of the source state and are skipped with
    /// their subtree. Symlinks and other special files are an error.
    pub fn populate(
        &mut self,
        source_dir: &Path,
        engine: &dyn TemplateEngine,
        data: &Value,
    ) -> Result<()> {
        let walker = WalkDir::new(source_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry));

        for entry in walker {
            let entry = entry.map_err(|e| Error::Walk {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| source_dir.to_path_buf()),
                source: e,
            })?;
            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path();
            let segments = path
                .strip_prefix(source_dir)
                .ok()
                .and_then(utf8_segments)
                .filter(|segments| !segments.is_empty())
                .ok_or_else(|| Error::InvalidSourceName {
                    path: path.to_path_buf(),
                })?;

            let file_type = entry.file_type();
            if file_type.is_dir() {
                self.populate_dir(path, &segments)?;
            } else if file_type.is_file() {
                self.populate_file(path, &segments, engine, data)?;
            } else {
                return Err(Error::UnsupportedFileType {
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    fn populate_dir(&mut self, path: &Path, segments: &[&str]) -> Result<()> {
        let source_name = NormalizedPath::from_segments(segments);
        let mut names = decoded_dir_names(path, segments)?;
        let attrs = decode_dir_name(segments[segments.len() - 1]);
        names.pop();

        let (dirs, files) = self
            .children_mut(&names)
            .ok_or_else(|| Error::InvalidSourceName {
                path: path.to_path_buf(),
            })?;
        check_unclaimed(path, &attrs.name, dirs, files)?;

        debug!(
            source = %source_name,
            target = %attrs.name,
            mode = %format_args!("{:o}", attrs.mode),
            "Registered directory"
        );
        dirs.insert(attrs.name, DirState::new(source_name, attrs.mode));
        Ok(())
    }

    fn populate_file(
        &mut self,
        path: &Path,
        segments: &[&str],
        engine: &dyn TemplateEngine,
        data: &Value,
    ) -> Result<()> {
        let source_name = NormalizedPath::from_segments(segments);
        let (dir_segments, file_segment) = segments.split_at(segments.len() - 1);
        let names = decoded_dir_names(path, dir_segments)?;
        let attrs = decode_file_name(file_segment[0]);
        check_target_name(path, &attrs.name)?;

        let mut contents = io::read_bytes(path)?;
        if attrs.is_template {
            contents = engine
                .render(source_name.as_str(), &contents, data)
                .map_err(|e| Error::template(path, e))?;
        }

        let (dirs, files) = self
            .children_mut(&names)
            .ok_or_else(|| Error::InvalidSourceName {
                path: path.to_path_buf(),
            })?;
        check_unclaimed(path, &attrs.name, dirs, files)?;

        debug!(
            source = %source_name,
            target = %attrs.name,
            mode = %format_args!("{:o}", attrs.mode),
            template = attrs.is_template,
            "Registered file"
        );
        files.insert(attrs.name, FileState::new(source_name, attrs.mode, contents));
        Ok(())
    }
}

fn decoded_dir_names(path: &Path, segments: &[&str]) -> Result<Vec<String>> {
    segments
        .iter()
        .map(|segment| {
            let name = decode_dir_name(segment).name;
            check_target_name(path, &name)?;
            Ok(name)
        })
        .collect()
}

/// Decoded names must be usable as a single target path segment.
fn check_target_name(path: &Path, name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidSourceName {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Two source entries must not decode to the same target name.
fn check_unclaimed(path: &Path, name: &str, dirs: &DirMap, files: &FileMap) -> Result<()> {
    let existing = dirs
        .get(name)
        .map(|dir| &dir.source_name)
        .or_else(|| files.get(name).map(|file| &file.source_name));
    match existing {
        Some(existing) => Err(Error::DuplicateTarget {
            path: path.to_path_buf(),
            name: name.to_string(),
            existing: existing.to_string(),
        }),
        None => Ok(()),
    }
}

fn is_ignored(entry: &DirEntry) -> bool {
    let ignored = entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'));
    if ignored {
        debug!(path = %entry.path().display(), "Skipping ignored source entry");
    }
    ignored
}

fn stat(path: &Path) -> Result<fs::Metadata> {
    fs::symlink_metadata(path).map_err(|e| dotstate_fs::Error::io(path, e).into())
}

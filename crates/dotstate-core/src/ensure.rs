//! Converging a target directory to a [`RootState`]
//!
//! The target is walked in lock-step with the model: at each level files are
//! handled before subdirectories, both in name order. An entry is only
//! touched when it differs from the model, so a second run over a converged
//! tree performs no writes. Target entries absent from the model are never
//! touched.

use std::fmt;
use std::path::{Path, PathBuf};

use dotstate_fs::checksum::compute_checksum;
use dotstate_fs::{System, permission_bits};
use serde::Serialize;
use tracing::{debug, info};

use crate::Result;
use crate::state::{DirMap, DirState, FileMap, FileState, RootState, sorted_names};

/// Options for [`RootState::ensure_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureOptions {
    /// Report the actions that would be taken without performing them.
    pub dry_run: bool,
}

/// Why a file is (re)written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WriteReason {
    /// Nothing exists at the path.
    Missing,
    /// The path holds a directory, symlink or special file.
    NotRegular,
    /// The file exists with other permission bits.
    ModeChanged { from: u32, to: u32 },
    /// The file has the right mode but another size.
    SizeChanged { from: u64, to: u64 },
    /// The file has the right mode and size but other contents.
    ContentChanged { expected: String, actual: String },
}

/// A single change made (or planned) on the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateDir { path: PathBuf, mode: u32 },
    SetPermissions { path: PathBuf, from: u32, to: u32 },
    RemoveAll { path: PathBuf },
    WriteFile {
        path: PathBuf,
        mode: u32,
        reason: WriteReason,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir { path, mode } => {
                write!(f, "create directory {} ({:o})", path.display(), mode)
            }
            Self::SetPermissions { path, from, to } => {
                write!(f, "chmod {} {:o} -> {:o}", path.display(), from, to)
            }
            Self::RemoveAll { path } => write!(f, "remove {}", path.display()),
            Self::WriteFile { path, mode, reason } => {
                let reason = match reason {
                    WriteReason::Missing => "missing".to_string(),
                    WriteReason::NotRegular => "not a regular file".to_string(),
                    WriteReason::ModeChanged { from, to } => format!("mode {:o} -> {:o}", from, to),
                    WriteReason::SizeChanged { from, to } => {
                        format!("size {} -> {} bytes", from, to)
                    }
                    WriteReason::ContentChanged { expected, actual } => {
                        format!("checksum mismatch: expected {}, got {}", expected, actual)
                    }
                };
                write!(f, "write {} ({:o}): {}", path.display(), mode, reason)
            }
        }
    }
}

/// Report from an ensure run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnsureReport {
    /// Whether the actions were only planned.
    pub dry_run: bool,
    /// Actions in the order they were (or would be) performed.
    pub actions: Vec<Action>,
}

impl EnsureReport {
    /// True if the target already matched the model.
    pub fn is_converged(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of file writes in the report.
    pub fn files_written(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| matches!(action, Action::WriteFile { .. }))
            .count()
    }
}

impl RootState {
    /// Bring `target_dir` into the state described by `self`.
    ///
    /// `target_dir` itself must exist. Stops at the first error, which may
    /// leave the target partially converged; running again resumes.
    pub fn ensure(&self, system: &dyn System, target_dir: &Path) -> Result<()> {
        self.ensure_with(system, target_dir, EnsureOptions::default())
            .map(|_| ())
    }

    /// Like [`RootState::ensure`], returning the list of actions taken.
    ///
    /// With `dry_run` set nothing is modified and the report lists what a real
    /// run would do; an empty report means the target is converged.
    pub fn ensure_with(
        &self,
        system: &dyn System,
        target_dir: &Path,
        options: EnsureOptions,
    ) -> Result<EnsureReport> {
        let mut reconciler = Reconciler {
            system,
            options,
            report: EnsureReport {
                dry_run: options.dry_run,
                actions: Vec::new(),
            },
        };
        reconciler.ensure_children(&self.dirs, &self.files, target_dir, false)?;

        info!(
            target = %target_dir.display(),
            actions = reconciler.report.actions.len(),
            dry_run = options.dry_run,
            "Ensure complete"
        );
        Ok(reconciler.report)
    }
}

struct Reconciler<'a> {
    system: &'a dyn System,
    options: EnsureOptions,
    report: EnsureReport,
}

impl Reconciler<'_> {
    /// `fresh` means `dir` was just created (or would be, in a dry run), so
    /// none of its children exist and none are stat'ed.
    fn ensure_children(
        &mut self,
        dirs: &DirMap,
        files: &FileMap,
        dir: &Path,
        fresh: bool,
    ) -> Result<()> {
        for name in sorted_names(files) {
            self.ensure_file(&files[name], &dir.join(name), fresh)?;
        }
        for name in sorted_names(dirs) {
            self.ensure_dir(&dirs[name], &dir.join(name), fresh)?;
        }
        Ok(())
    }

    fn ensure_dir(&mut self, state: &DirState, path: &Path, parent_fresh: bool) -> Result<()> {
        let metadata = if parent_fresh {
            None
        } else {
            self.system.metadata(path)?
        };

        let fresh = match metadata {
            Some(metadata) if metadata.is_dir() => {
                let current = permission_bits(&metadata);
                if current != state.mode {
                    self.apply(Action::SetPermissions {
                        path: path.to_path_buf(),
                        from: current,
                        to: state.mode,
                    })?;
                }
                false
            }
            Some(_) => {
                self.apply(Action::RemoveAll {
                    path: path.to_path_buf(),
                })?;
                self.apply(Action::CreateDir {
                    path: path.to_path_buf(),
                    mode: state.mode,
                })?;
                true
            }
            None => {
                self.apply(Action::CreateDir {
                    path: path.to_path_buf(),
                    mode: state.mode,
                })?;
                true
            }
        };

        self.ensure_children(&state.dirs, &state.files, path, fresh)
    }

    fn ensure_file(&mut self, state: &FileState, path: &Path, parent_fresh: bool) -> Result<()> {
        let metadata = if parent_fresh {
            None
        } else {
            self.system.metadata(path)?
        };

        let reason = match metadata {
            None => WriteReason::Missing,
            Some(metadata) if !metadata.is_file() => {
                // A rename cannot replace a directory
                self.apply(Action::RemoveAll {
                    path: path.to_path_buf(),
                })?;
                WriteReason::NotRegular
            }
            Some(metadata) if permission_bits(&metadata) != state.mode => WriteReason::ModeChanged {
                from: permission_bits(&metadata),
                to: state.mode,
            },
            Some(metadata) if metadata.len() != state.contents.len() as u64 => {
                WriteReason::SizeChanged {
                    from: metadata.len(),
                    to: state.contents.len() as u64,
                }
            }
            Some(_) => {
                let actual = self.system.read(path)?;
                if actual == state.contents {
                    debug!(path = %path.display(), "Up to date");
                    return Ok(());
                }
                WriteReason::ContentChanged {
                    expected: compute_checksum(&state.contents),
                    actual: compute_checksum(&actual),
                }
            }
        };

        let action = Action::WriteFile {
            path: path.to_path_buf(),
            mode: state.mode,
            reason,
        };
        self.log(&action);
        if !self.options.dry_run {
            self.system.write_file(path, &state.contents, state.mode)?;
        }
        self.report.actions.push(action);
        Ok(())
    }

    /// Perform a non-write action (unless dry run) and record it.
    fn apply(&mut self, action: Action) -> Result<()> {
        self.log(&action);
        if !self.options.dry_run {
            match &action {
                Action::CreateDir { path, mode } => self.system.create_dir(path, *mode)?,
                Action::SetPermissions { path, to, .. } => self.system.set_permissions(path, *to)?,
                Action::RemoveAll { path } => self.system.remove_all(path)?,
                Action::WriteFile { .. } => {}
            }
        }
        self.report.actions.push(action);
        Ok(())
    }

    fn log(&self, action: &Action) {
        if self.options.dry_run {
            info!("[dry-run] Would {}", action);
        } else {
            info!("{}", action);
        }
    }
}

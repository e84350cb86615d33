//! Error types for dotstate-core

use std::path::PathBuf;

use crate::template::TemplateError;

/// Result type for dotstate-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dotstate-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem error from dotstate-fs
    #[error(transparent)]
    Fs(#[from] dotstate_fs::Error),

    /// The source tree could not be traversed
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Source entry that is neither a regular file nor a directory
    #[error("Unsupported file type: {path}")]
    UnsupportedFileType { path: PathBuf },

    /// Source entry whose name cannot be placed in the model
    #[error("Invalid source name: {path}")]
    InvalidSourceName { path: PathBuf },

    /// Two source entries decode to the same target name
    #[error("{path} maps to {name}, already claimed by {existing}")]
    DuplicateTarget {
        path: PathBuf,
        name: String,
        existing: String,
    },

    /// Template parse or execution failure
    #[error("Template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    /// Failure writing an archive entry
    #[error("Failed to archive {path}: {source}")]
    Archive {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The invoking user's identity could not be resolved
    #[error("Identity lookup failed: {message}")]
    Identity { message: String },

    /// A path expected inside the target directory is outside it
    #[error("{path} is not under target directory {target}")]
    NotUnderTarget { path: PathBuf, target: PathBuf },

    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },
}

impl Error {
    pub(crate) fn template(path: impl Into<PathBuf>, source: TemplateError) -> Self {
        Self::Template {
            path: path.into(),
            source,
        }
    }
}

//! Declarative home-directory state for dotstate
//!
//! A *source tree* describes a *target tree* through entry names: prefixes
//! and suffixes carry permissions and template status (see [`attr`]). This
//! crate provides:
//!
//! - **Naming convention**: decoding and encoding source entry names
//! - **State model**: [`RootState`], [`DirState`] and [`FileState`]
//! - **Loading**: [`SourceTree::load`] walks a source tree into a model,
//!   rendering templates with a [`TemplateEngine`]
//! - **Convergence**: [`RootState::ensure`] makes a target directory match a
//!   model, writing only what differs
//! - **Archiving**: [`Archiver`] writes a model as a deterministic tar stream
//! - **Lookup**: [`RootState::find_source_file`] maps a target path back to
//!   its source entry
//!
//! # Example
//!
//! ```no_run
//! use dotstate_core::{Config, RealSystem, SimpleEngine};
//!
//! fn apply() -> dotstate_core::Result<()> {
//!     let config = Config::load_or_default(std::path::Path::new("dotstate.toml"))?;
//!     let state = config.source_tree().load(&SimpleEngine::new(), &config.data)?;
//!     state.ensure(&RealSystem::new(), &config.target_dir)
//! }
//! ```

pub mod archive;
pub mod attr;
pub mod config;
pub mod ensure;
pub mod error;
pub mod logging;
pub mod source;
pub mod state;
pub mod template;

pub use archive::{Archiver, Identity};
pub use config::Config;
pub use dotstate_fs::{RealSystem, System};
pub use ensure::{Action, EnsureOptions, EnsureReport, WriteReason};
pub use error::{Error, Result};
pub use source::SourceTree;
pub use state::{DirState, FileState, RootState};
pub use template::{SimpleEngine, TemplateEngine, TemplateError};

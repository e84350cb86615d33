//! Filesystem layer for dotstate
//!
//! Provides the [`System`] handle used to converge a target tree, atomic
//! permission-preserving writes, normalized relative paths, and
//! format-agnostic config files.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;
pub mod system;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use path::NormalizedPath;
pub use system::{PERMISSION_BITS, RealSystem, System, permission_bits};

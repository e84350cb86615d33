//! Shared test utilities for the dotstate workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`tree`]: [`TestTree`] for building and asserting on temporary
//!   source and target directories
//! - [`system`]: [`RecordingSystem`], a [`dotstate_fs::System`] that records
//!   every mutating call

pub mod system;
pub mod tree;

pub use system::{Call, RecordingSystem};
pub use tree::TestTree;

//! Security module for taskloom: what the tool handlers may touch.
//!
//! Provides:
//! - **Path confinement**: every file path resolves inside the workspace
//! - **Command screening**: blocked shell patterns are refused before spawning

pub mod command;
pub mod path;

pub use command::{CommandCheck, CommandPolicy};
pub use path::{resolve_in_workspace, PathValidationError};

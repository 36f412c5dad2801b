#![deny(unreachable_patterns)]
//! External tool wrapper for recording post-processing.
//!
//! This crate provides:
//! - Type-safe command building for the commercial cutter
//! - A runner with timeout enforcement that kills the whole process group
//! - `.bak` sibling backups that are created, restored or discarded
//! - File probing helpers

pub mod backup;
pub mod command;
pub mod error;
pub mod probe;

pub use backup::{backup_path, BackupFile, BACKUP_SUFFIX};
pub use command::{ToolCommand, ToolOutput, ToolRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{file_size, is_file};

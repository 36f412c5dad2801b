//! Error types for media operations.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while running tools or handling backups.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Executable not found: {}", .0.display())]
    ToolNotFound(PathBuf),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Backup already exists: {}", .0.display())]
    BackupExists(PathBuf),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

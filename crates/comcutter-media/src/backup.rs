//! Sibling `.bak` backups around a destructive tool run.
//!
//! A backup is created before the tool touches the original, then either
//! discarded once the result is accepted or moved back over the original.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Suffix appended to the full file name of the original.
pub const BACKUP_SUFFIX: &str = ".bak";

/// `<path>.bak`, keeping the original extension in place.
pub fn backup_path(path: impl AsRef<Path>) -> PathBuf {
    let mut name: OsString = path.as_ref().as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Backup of a single file.
#[derive(Debug, Clone)]
pub struct BackupFile {
    original: PathBuf,
    backup: PathBuf,
}

impl BackupFile {
    pub fn for_path(original: impl AsRef<Path>) -> Self {
        let original = original.as_ref().to_path_buf();
        let backup = backup_path(&original);
        Self { original, backup }
    }

    pub fn path(&self) -> &Path {
        &self.backup
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.backup).await.unwrap_or(false)
    }

    /// Copy the original to the backup path. Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A backup already exists (it may be the only intact copy left by an
    ///   interrupted run, so it is never overwritten)
    /// - The original cannot be read or the copy cannot be written
    pub async fn create(&self) -> MediaResult<u64> {
        if fs::try_exists(&self.backup).await? {
            return Err(MediaError::BackupExists(self.backup.clone()));
        }

        debug!(
            "backing up file:\nsource      : {}\ndestination : {}",
            self.original.display(),
            self.backup.display()
        );

        match fs::copy(&self.original, &self.backup).await {
            Ok(bytes) => {
                debug!("backup complete");
                Ok(bytes)
            }
            Err(e) => {
                // Don't leave a partial copy that would block the next attempt.
                if let Err(cleanup) = fs::remove_file(&self.backup).await {
                    if cleanup.kind() != ErrorKind::NotFound {
                        warn!(
                            "Failed to remove partial backup {}: {}",
                            self.backup.display(),
                            cleanup
                        );
                    }
                }
                if e.kind() == ErrorKind::NotFound {
                    return Err(MediaError::FileNotFound(self.original.clone()));
                }
                Err(e.into())
            }
        }
    }

    /// Move the backup back over the original, replacing whatever the tool
    /// left behind.
    pub async fn restore(&self) -> MediaResult<()> {
        debug!(
            "restoring backup file:\nsource      : {}\ndestination : {}",
            self.backup.display(),
            self.original.display()
        );

        fs::rename(&self.backup, &self.original).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                MediaError::FileNotFound(self.backup.clone())
            } else {
                MediaError::from(e)
            }
        })?;

        debug!("restore complete");
        Ok(())
    }

    /// Delete the backup after the result has been accepted.
    pub async fn discard(&self) -> MediaResult<()> {
        match fs::remove_file(&self.backup).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Backup already gone: {}", self.backup.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path_keeps_extension() {
        assert_eq!(
            backup_path("/library/shows/ep1.mkv"),
            PathBuf::from("/library/shows/ep1.mkv.bak")
        );
        assert_eq!(backup_path("/library/noext"), PathBuf::from("/library/noext.bak"));
    }

    #[tokio::test]
    async fn test_create_and_discard() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("ep1.ts");
        fs::write(&original, b"original bytes").await.unwrap();

        let backup = BackupFile::for_path(&original);
        assert_eq!(backup.create().await.unwrap(), 14);
        assert_eq!(fs::read(backup.path()).await.unwrap(), b"original bytes");

        backup.discard().await.unwrap();
        assert!(!backup.exists().await);
        assert!(original.exists());
    }

    #[tokio::test]
    async fn test_restore_overwrites_result() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("ep1.ts");
        fs::write(&original, b"original bytes").await.unwrap();

        let backup = BackupFile::for_path(&original);
        backup.create().await.unwrap();
        fs::write(&original, b"trunc").await.unwrap();

        backup.restore().await.unwrap();
        assert_eq!(fs::read(&original).await.unwrap(), b"original bytes");
        assert!(!backup.exists().await);
    }

    #[tokio::test]
    async fn test_restore_when_original_removed() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("ep1.ts");
        fs::write(&original, b"original bytes").await.unwrap();

        let backup = BackupFile::for_path(&original);
        backup.create().await.unwrap();
        fs::remove_file(&original).await.unwrap();

        backup.restore().await.unwrap();
        assert_eq!(fs::read(&original).await.unwrap(), b"original bytes");
    }

    #[tokio::test]
    async fn test_existing_backup_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("ep1.ts");
        fs::write(&original, b"damaged").await.unwrap();
        fs::write(backup_path(&original), b"stray original").await.unwrap();

        let backup = BackupFile::for_path(&original);
        assert!(matches!(backup.create().await, Err(MediaError::BackupExists(_))));
        assert_eq!(fs::read(backup.path()).await.unwrap(), b"stray original");
    }

    #[tokio::test]
    async fn test_create_missing_original() {
        let dir = TempDir::new().unwrap();
        let backup = BackupFile::for_path(dir.path().join("gone.ts"));

        assert!(matches!(backup.create().await, Err(MediaError::FileNotFound(_))));
        assert!(!backup.exists().await);
    }
}

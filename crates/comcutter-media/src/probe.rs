//! File probing.

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Size of the file at `path` in bytes.
pub async fn file_size(path: impl AsRef<Path>) -> MediaResult<u64> {
    let path = path.as_ref();
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(MediaError::FileNotFound(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(MediaError::FileNotFound(path.to_path_buf())),
        Err(e) => Err(e.into()),
    }
}

/// Whether `path` exists and is a regular file (symlinks are followed).
pub async fn is_file(path: impl AsRef<Path>) -> bool {
    fs::metadata(path.as_ref())
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ep1.ts");
        fs::write(&path, vec![0u8; 1000]).await.unwrap();

        assert_eq!(file_size(&path).await.unwrap(), 1000);
        assert!(is_file(&path).await);
    }

    #[tokio::test]
    async fn test_missing_and_directory() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("missing.ts");
        assert!(matches!(file_size(&missing).await, Err(MediaError::FileNotFound(_))));
        assert!(!is_file(&missing).await);

        assert!(matches!(file_size(dir.path()).await, Err(MediaError::FileNotFound(_))));
        assert!(!is_file(dir.path()).await);
    }
}

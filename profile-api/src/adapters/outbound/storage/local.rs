use std::{io, path::PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::domain::ports::outbound::{StorageError, StorageProvider};

/// Blob store backed by a directory on the local filesystem. Paths are
/// resolved relative to `root`; callers are responsible for handing in
/// validated, storage-relative paths.
pub struct LocalStorageProvider {
    root: PathBuf,
}

impl LocalStorageProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    async fn put_file(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(full_path, bytes).await?;

        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.resolve(path)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_reads_and_deletes_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path());

        provider.put_file("avatars/foo.png", b"img").await.unwrap();
        assert_eq!(provider.read_file("avatars/foo.png").await.unwrap(), b"img");

        provider.delete_file("avatars/foo.png").await.unwrap();
        assert!(matches!(
            provider.read_file("avatars/foo.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_missing_blob_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path());

        assert!(matches!(
            provider.delete_file("avatars/missing.png").await,
            Err(StorageError::NotFound(_))
        ));
    }
}

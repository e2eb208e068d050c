use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A pluggable blob store addressed by storage-relative paths such as
/// `avatars/<filename>`.
#[async_trait]
pub trait StorageProvider: Send + Sync + 'static {
    async fn put_file(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete_file(&self, path: &str) -> Result<(), StorageError>;
}

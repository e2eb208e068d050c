use thiserror::Error;

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("user not found")]
    UserNotFound,
    #[error("avatar not found")]
    NotFound,
    #[error("invalid image payload")]
    InvalidImage,
    #[error("avatar payload exceeds limit")]
    PayloadTooLarge,
    #[error("unsupported media type")]
    UnsupportedMediaType,
    #[error("avatar storage failed: {0}")]
    Storage(String),
    #[error("user directory failed: {0}")]
    Directory(String),
}

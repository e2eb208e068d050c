use async_trait::async_trait;

use crate::domain::{
    models::{AvatarBlob, UserId},
    AvatarError,
};

#[async_trait]
pub trait AvatarService: Send + Sync + 'static {
    /// Remove a user's avatar: best-effort blob deletion followed by a
    /// guaranteed clear of the directory reference.
    async fn remove_avatar(&self, user_id: &UserId) -> Result<(), AvatarError>;

    async fn upload_avatar(
        &self,
        user_id: &UserId,
        image: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<(), AvatarError>;

    /// Read a stored avatar blob by filename for serving.
    async fn open_avatar(&self, filename: &str) -> Result<AvatarBlob, AvatarError>;
}

use async_trait::async_trait;

use crate::domain::{models::UserId, AvatarError};

/// The slice of the user store the avatar service needs: reading and
/// writing a single user's `image` reference.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Current avatar reference of the user, `None` when the user has no
    /// avatar. Fails with [`AvatarError::UserNotFound`] when the id does
    /// not resolve.
    async fn find_user_image(&self, user_id: &UserId) -> Result<Option<String>, AvatarError>;

    async fn clear_user_image(&self, user_id: &UserId) -> Result<(), AvatarError>;

    async fn set_user_image(&self, user_id: &UserId, image: &str) -> Result<(), AvatarError>;
}

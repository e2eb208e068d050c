use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{models::UserId, ports::outbound::UserDirectory, AvatarError};

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_user_image(&self, user_id: &UserId) -> Result<Option<String>, AvatarError> {
        let row = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT image
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| AvatarError::Directory(err.to_string()))?;

        row.ok_or(AvatarError::UserNotFound)
    }

    async fn clear_user_image(&self, user_id: &UserId) -> Result<(), AvatarError> {
        sqlx::query(
            r#"
            UPDATE users
            SET image = NULL
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| AvatarError::Directory(err.to_string()))?;

        Ok(())
    }

    async fn set_user_image(&self, user_id: &UserId, image: &str) -> Result<(), AvatarError> {
        sqlx::query(
            r#"
            UPDATE users
            SET image = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .bind(image)
        .execute(&self.pool)
        .await
        .map_err(|err| AvatarError::Directory(err.to_string()))?;

        Ok(())
    }
}

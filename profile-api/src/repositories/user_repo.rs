use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{models::UserId, Role, User};

use super::repo_error::RepositoryError;

pub trait UserRepository {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn upsert_user(&self, user: &NewUser) -> Result<User, RepositoryError>;
}

pub struct UserRepositoryImpl {
    pool: PgPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    image: Option<String>,
    role: String,
    access_token: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::new(row.id),
            email: row.email,
            name: row.name,
            image: row.image,
            role: Role::from(row.role),
            access_token: row.access_token,
        }
    }
}

impl UserRepository for UserRepositoryImpl {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, image, role, access_token
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn upsert_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        // Role and image are deliberately not overwritten on login: roles
        // are managed by admins, images by the avatar service.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, name, role, access_token)
            VALUES ($1, $2, $3, 'USER', $4)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                access_token = EXCLUDED.access_token
            RETURNING id, email, name, image, role, access_token
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.access_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(User::from(row))
    }
}

pub struct NewUser {
    email: String,
    name: String,
    access_token: String,
}

impl NewUser {
    pub fn new(email: String, name: String, access_token: String) -> Self {
        Self {
            email,
            name,
            access_token,
        }
    }
}

use std::ops::Deref;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{domain::models::UserId, domain::User, routes::ApiError};

use super::AuthSession;

/// A custom Axum extractor that extracts the authenticated [`User`]
/// directly from the request. Returns 401 Unauthorized if no user is
/// logged in.
///
/// Safe to log — `User`'s `Debug` impl redacts sensitive fields.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    user: User,
}

impl Deref for AuthUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthSession: FromRequestParts<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_session = AuthSession::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::unauthorized("Unauthorized"))?;

        let user = auth_session
            .user
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

        Ok(AuthUser {
            id: user.id.clone(),
            user,
        })
    }
}

/// Extractor for routes of the admin surface. Rejects callers that are
/// logged in but not administrators with the same 401 a missing session
/// gets, so the surface does not reveal which of the two failed.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl Deref for AdminUser {
    type Target = AuthUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AuthSession: FromRequestParts<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        authorize_admin(&user)?;

        Ok(AdminUser(user))
    }
}

fn authorize_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::unauthorized("Unauthorized"))
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::domain::Role;

    use super::*;

    fn user_with_role(role: Role) -> User {
        User {
            id: UserId::from("alice"),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            image: None,
            role,
            access_token: "token".to_string(),
        }
    }

    #[test]
    fn admins_pass_the_role_check() {
        assert!(authorize_admin(&user_with_role(Role::Admin)).is_ok());
    }

    #[tokio::test]
    async fn non_admins_are_rejected_with_401_and_body() {
        let rejection = authorize_admin(&user_with_role(Role::User)).unwrap_err();

        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Unauthorized");
    }
}

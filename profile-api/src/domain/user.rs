use std::fmt;

use crate::domain::models::UserId;
use axum_login::AuthUser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    User,
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "ADMIN" => Role::Admin,
            "USER" => Role::User,
            _ => Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role_str = match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        };
        write!(f, "{role_str}")
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub role: Role,
    #[serde(skip)]
    pub access_token: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("image", &self.image)
            .field("role", &self.role)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

impl AuthUser for User {
    type Id = String;

    fn id(&self) -> Self::Id {
        self.id.as_str().to_owned()
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.access_token.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_database_representation() {
        assert_eq!(Role::from(Role::Admin.to_string()), Role::Admin);
        assert_eq!(Role::from(Role::User.to_string()), Role::User);
    }

    #[test]
    fn unknown_role_falls_back_to_user() {
        assert_eq!(Role::from("SUPERVISOR".to_string()), Role::User);
    }
}

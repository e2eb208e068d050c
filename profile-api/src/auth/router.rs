use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_login::tower_sessions::Session;
use oauth2::CsrfToken;
use serde::Deserialize;
use tracing::instrument;

use crate::{app_state::AppState, domain::User, routes::ApiError};

use super::backend::{AuthSession, Credentials};

const CSRF_STATE_KEY: &str = "auth.csrf-state";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/callback", get(callback))
}

/// The current session's user; 401 when nobody is logged in.
async fn me(auth_session: AuthSession) -> Result<Json<User>, ApiError> {
    auth_session
        .user
        .map(Json)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
}

/// Start the OAuth2 flow: remember the CSRF state in the session and
/// hand the authorization URL back to the frontend.
async fn login(auth_session: AuthSession, session: Session) -> Result<String, ApiError> {
    let (auth_url, csrf_state) = auth_session.backend.authorize_url();

    session
        .insert(CSRF_STATE_KEY, csrf_state.secret())
        .await
        .map_err(|err| {
            tracing::error!("Failed to store CSRF state in session: {}", err);
            ApiError::internal()
        })?;

    Ok(auth_url.to_string())
}

/// Destroy the session.
async fn logout(mut auth_session: AuthSession) -> Result<StatusCode, ApiError> {
    auth_session.logout().await.map_err(|err| {
        tracing::error!("Failed to destroy session: {}", err);
        ApiError::internal()
    })?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, Deserialize)]
struct AuthzResp {
    code: String,
    state: CsrfToken,
}

#[instrument(name = "GET /auth/callback", skip_all)]
async fn callback(
    mut auth_session: AuthSession,
    session: Session,
    State(app_state): State<AppState>,
    Query(AuthzResp {
        code,
        state: new_state,
    }): Query<AuthzResp>,
) -> Response {
    let Ok(Some(old_state)) = session.get(CSRF_STATE_KEY).await else {
        return ApiError::bad_request("Missing CSRF state").into_response();
    };

    let creds = Credentials {
        code,
        old_state,
        new_state,
    };

    let user = match auth_session.authenticate(creds).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::error!("CSRF state validation failed");
            return ApiError::unauthorized("Unauthorized").into_response();
        }
        Err(err) => {
            tracing::error!("Authentication failed: {}", err);
            return ApiError::internal().into_response();
        }
    };

    if let Err(err) = auth_session.login(&user).await {
        tracing::error!("Failed to establish session for {}: {}", user.id, err);
        return ApiError::internal().into_response();
    }

    tracing::info!("User {} logged in", user.id);
    Redirect::to(app_state.app_url.as_str()).into_response()
}

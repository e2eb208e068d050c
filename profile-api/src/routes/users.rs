use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use tracing::instrument;

use crate::{app_state::AppState, auth::AdminUser, domain::models::UserId, routes::ApiError};

// Allow multipart overhead while keeping the actual avatar payload
// policy at 5 MiB.
const AVATAR_UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:user_id/avatar",
            post(upload_user_avatar).delete(delete_user_avatar),
        )
        .route_layer(DefaultBodyLimit::max(AVATAR_UPLOAD_BODY_LIMIT))
}

/// Admin-only removal of a user's avatar. The blob delete is best-effort
/// inside the service; the directory reference is always cleared.
#[instrument(name = "DELETE /users/:user_id/avatar", skip(admin, app_state))]
async fn delete_user_avatar(
    admin: AdminUser,
    State(app_state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = UserId::from(user_id);
    app_state.avatar_service.remove_avatar(&user_id).await?;

    tracing::info!("Admin {} removed avatar of user {}", admin.id, user_id);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "POST /users/:user_id/avatar", skip(admin, app_state, multipart))]
async fn upload_user_avatar(
    admin: AdminUser,
    State(app_state): State<AppState>,
    Path(user_id): Path<String>,
    mut multipart: Multipart,
) -> Result<StatusCode, ApiError> {
    let (image, content_type) = extract_image_from_multipart(&mut multipart).await?;

    let user_id = UserId::from(user_id);
    app_state
        .avatar_service
        .upload_avatar(&user_id, image, content_type)
        .await?;

    tracing::info!("Admin {} uploaded avatar for user {}", admin.id, user_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn extract_image_from_multipart(
    multipart: &mut Multipart,
) -> Result<(Vec<u8>, Option<String>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("failed to parse multipart field"))?
    {
        if field.name() != Some("avatar") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request("failed to read avatar payload"))?;

        return Ok((bytes.to_vec(), content_type));
    }

    Err(ApiError::bad_request("missing avatar file field"))
}

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::Response,
    routing::get,
    Router,
};
use tracing::instrument;

use crate::{app_state::AppState, routes::ApiError};

const DEFAULT_AVATAR_MIME: &str = "application/octet-stream";
const AVATAR_CACHE_CONTROL: &str = "private, max-age=3600";

pub fn router() -> Router<AppState> {
    Router::new().route("/:filename", get(serve_avatar))
}

#[instrument(name = "GET /avatars/:filename", skip(app_state))]
async fn serve_avatar(
    State(app_state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    // The filename must stay a single path segment under the avatars
    // namespace; anything else could escape the storage root.
    if !is_valid_filename(&filename) {
        return Err(ApiError::bad_request("Invalid avatar filename"));
    }

    let blob = app_state.avatar_service.open_avatar(&filename).await?;

    let mut response = Response::new(Body::from(blob.bytes));
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&blob.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_AVATAR_MIME)),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(AVATAR_CACHE_CONTROL),
    );

    Ok(response)
}

fn is_valid_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains("..")
        && !filename.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_filenames() {
        assert!(is_valid_filename("foo.png"));
        assert!(is_valid_filename("7f3b2c1a-user.webp"));
    }

    #[test]
    fn rejects_traversal_and_nested_paths() {
        assert!(!is_valid_filename(""));
        assert!(!is_valid_filename(".."));
        assert!(!is_valid_filename("../secrets.txt"));
        assert!(!is_valid_filename("nested/foo.png"));
        assert!(!is_valid_filename("nested\\foo.png"));
        assert!(!is_valid_filename(".hidden"));
    }
}

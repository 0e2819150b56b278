use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;

use super::services::{upload_image, UploadItem};
use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub url: String,
}

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/images", post(upload))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}

/// POST /images (multipart, field `image` or `imagen`)
#[instrument(skip(state, mp))]
pub async fn upload(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<UploadedImage>), ApiError> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::invalid_input(e.body_text()))?
    {
        if !matches!(field.name(), Some("image") | Some("imagen")) {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::invalid_input(e.body_text()))?;

        let url = upload_image(
            state.storage.as_ref(),
            identity.id,
            UploadItem { body, content_type },
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(UploadedImage { url })));
    }

    Err(ApiError::invalid_input("image field is required"))
}

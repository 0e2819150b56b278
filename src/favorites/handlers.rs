use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CheckResponse, ToggleRequest, ToggleResponse},
    repo_types::FavoriteEntry,
    services,
};
use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::ApiError,
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/favorites", post(toggle_favorite).get(list_favorites))
        .route("/favorites/check/:post_id", get(check_favorite))
}

/// 201 when the favorite was added, 200 when it was removed.
#[instrument(skip(state, payload))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<ToggleRequest>,
) -> Result<(StatusCode, Json<ToggleResponse>), ApiError> {
    let added = services::toggle(
        state.favorites.as_ref(),
        state.posts.as_ref(),
        &identity,
        payload,
    )
    .await?;
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ToggleResponse { added })))
}

#[instrument(skip(state))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<FavoriteEntry>>, ApiError> {
    Ok(Json(
        services::list(state.favorites.as_ref(), &identity).await?,
    ))
}

#[instrument(skip(state))]
pub async fn check_favorite(
    State(state): State<AppState>,
    MaybeAuthUser(identity): MaybeAuthUser,
    ApiPath(post_id): ApiPath<i64>,
) -> Result<Json<CheckResponse>, ApiError> {
    let is_favorite =
        services::is_favorite(state.favorites.as_ref(), identity.as_ref(), post_id).await?;
    Ok(Json(CheckResponse { is_favorite }))
}

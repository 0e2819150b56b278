use axum::{
    extract::State,
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use super::{
    dto::{ListQuery, PostRequest},
    repo_types::{Post, PostDetails},
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/:id", get(get_post))
        .route("/me/posts", get(my_posts))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/:id", axum::routing::put(update_post).delete(delete_post))
        .route("/posts/:id/claim", post(claim_post))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<PostDetails>>, ApiError> {
    let filter = services::filter_from(query)?;
    Ok(Json(state.posts.list(&filter).await?))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PostDetails>, ApiError> {
    Ok(Json(services::get_post(state.posts.as_ref(), id).await?))
}

#[instrument(skip(state))]
pub async fn my_posts(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.posts.list_by_owner(identity.id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<PostRequest>,
) -> Result<(StatusCode, HeaderMap, Json<Post>), ApiError> {
    let post = services::create_post(
        state.posts.as_ref(),
        state.categories.as_ref(),
        &identity,
        payload,
    )
    .await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/posts/{}", post.id)) {
        headers.insert(LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(post)))
}

#[instrument(skip(state, payload))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<PostRequest>,
) -> Result<Json<Post>, ApiError> {
    let post = services::update_post(
        state.posts.as_ref(),
        state.categories.as_ref(),
        &identity,
        id,
        payload,
    )
    .await?;
    Ok(Json(post))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    services::delete_post(state.posts.as_ref(), &identity, id).await?;
    Ok(Json(json!({ "deleted": true, "id": id })))
}

#[instrument(skip(state))]
pub async fn claim_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(
        services::claim_post(state.posts.as_ref(), &identity, id).await?,
    ))
}

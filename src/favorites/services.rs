use tracing::{info, warn};

use super::{dto::ToggleRequest, repo::FavoriteStore, repo_types::FavoriteEntry};
use crate::{
    auth::extractors::AuthenticatedIdentity, db::StoreError, error::ApiError,
    posts::repo::PostStore, validate::required_id,
};

/// Adds the favorite if absent, removes it if present. Returns whether the
/// post is now favorited.
pub async fn toggle(
    favorites: &dyn FavoriteStore,
    posts: &dyn PostStore,
    identity: &AuthenticatedIdentity,
    req: ToggleRequest,
) -> Result<bool, ApiError> {
    let post_id = required_id(req.post_id.as_ref(), "post_id")?;
    if posts.find(post_id).await?.is_none() {
        return Err(ApiError::not_found("Post not found"));
    }

    let added = favorites
        .toggle(identity.id, post_id)
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation { .. } => {
                warn!(user_id = identity.id, post_id, "concurrent favorite toggle");
                ApiError::conflict(
                    "DUPLICATE_FAVORITE",
                    "Favorite was changed concurrently, retry the request",
                )
            }
            StoreError::ForeignKeyViolation { .. } => ApiError::not_found("Post not found"),
            other => other.into(),
        })?;

    info!(user_id = identity.id, post_id, added, "favorite toggled");
    Ok(added)
}

/// `false` for anonymous callers instead of an error.
pub async fn is_favorite(
    favorites: &dyn FavoriteStore,
    identity: Option<&AuthenticatedIdentity>,
    post_id: i64,
) -> Result<bool, ApiError> {
    match identity {
        Some(identity) => Ok(favorites.exists(identity.id, post_id).await?),
        None => Ok(false),
    }
}

pub async fn list(
    favorites: &dyn FavoriteStore,
    identity: &AuthenticatedIdentity,
) -> Result<Vec<FavoriteEntry>, ApiError> {
    Ok(favorites.list_for_user(identity.id).await?)
}

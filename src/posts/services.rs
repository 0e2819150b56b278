use serde_json::json;
use tracing::{info, warn};

use super::{
    dto::{ListQuery, PostRequest},
    repo::PostStore,
    repo_types::{ClaimOutcome, NewPost, Post, PostDetails, PostFilter},
};
use crate::{
    auth::extractors::AuthenticatedIdentity,
    categories::repo::CategoryStore,
    db::StoreError,
    error::ApiError,
    validate::{optional_text, positive_price, required_id, required_text},
};

const MAX_PAGE: i64 = 100;

/// Checks every required field; runs before any store access.
pub fn validate(req: PostRequest) -> Result<NewPost, ApiError> {
    Ok(NewPost {
        title: required_text(req.title, "titulo")?,
        description: required_text(req.description, "descripcion")?,
        price: positive_price(req.price.as_ref(), "precio")?,
        category_id: required_id(req.category_id.as_ref(), "categoria_id")?,
        image: optional_text(req.image),
    })
}

/// Unclaimed posts are open to any authenticated user; claimed ones only to
/// their owner.
pub fn ensure_can_modify(post: &Post, identity: &AuthenticatedIdentity) -> Result<(), ApiError> {
    match post.user_id {
        Some(owner) if owner != identity.id => {
            warn!(post_id = post.id, owner, actor = identity.id, "not the post owner");
            Err(ApiError::forbidden("Only the owner may modify this post"))
        }
        _ => Ok(()),
    }
}

pub fn filter_from(query: ListQuery) -> Result<PostFilter, ApiError> {
    if query.offset < 0 {
        return Err(ApiError::invalid_input("offset must not be negative"));
    }
    Ok(PostFilter {
        category_id: query.category_id,
        search: optional_text(query.q),
        limit: query.limit.clamp(1, MAX_PAGE),
        offset: query.offset,
    })
}

pub async fn get_post(posts: &dyn PostStore, id: i64) -> Result<PostDetails, ApiError> {
    posts
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

async fn ensure_category(categories: &dyn CategoryStore, id: i64) -> Result<(), ApiError> {
    match categories.find(id).await? {
        Some(_) => Ok(()),
        None => Err(unknown_category()),
    }
}

fn unknown_category() -> ApiError {
    ApiError::invalid_input("categoria_id does not reference an existing category")
}

fn map_write_error(err: StoreError) -> ApiError {
    match err {
        StoreError::ForeignKeyViolation { .. } => unknown_category(),
        other => other.into(),
    }
}

pub async fn create_post(
    posts: &dyn PostStore,
    categories: &dyn CategoryStore,
    identity: &AuthenticatedIdentity,
    req: PostRequest,
) -> Result<Post, ApiError> {
    let new = validate(req)?;
    ensure_category(categories, new.category_id).await?;

    let post = posts
        .create(Some(identity.id), &new)
        .await
        .map_err(map_write_error)?;
    info!(post_id = post.id, user_id = identity.id, "post created");
    Ok(post)
}

pub async fn update_post(
    posts: &dyn PostStore,
    categories: &dyn CategoryStore,
    identity: &AuthenticatedIdentity,
    id: i64,
    req: PostRequest,
) -> Result<Post, ApiError> {
    let changes = validate(req)?;
    let current = get_post(posts, id).await?;
    ensure_can_modify(&current.post, identity)?;
    ensure_category(categories, changes.category_id).await?;

    match posts
        .update(id, identity.id, &changes)
        .await
        .map_err(map_write_error)?
    {
        Some(post) => {
            info!(post_id = id, user_id = identity.id, "post updated");
            Ok(post)
        }
        None => Err(lost_race(posts, id, identity).await),
    }
}

pub async fn delete_post(
    posts: &dyn PostStore,
    identity: &AuthenticatedIdentity,
    id: i64,
) -> Result<(), ApiError> {
    let current = get_post(posts, id).await?;
    ensure_can_modify(&current.post, identity)?;

    match posts.delete(id, identity.id).await {
        Ok(true) => {
            info!(post_id = id, user_id = identity.id, "post deleted");
            Ok(())
        }
        Ok(false) => Err(lost_race(posts, id, identity).await),
        Err(StoreError::ForeignKeyViolation { .. }) => Err(ApiError::conflict(
            "RESOURCE_REFERENCED",
            "Post is still referenced by other records",
        )),
        Err(e) => Err(e.into()),
    }
}

/// Unclaimed -> claimed by `identity`. Exactly one claim can win.
pub async fn claim_post(
    posts: &dyn PostStore,
    identity: &AuthenticatedIdentity,
    id: i64,
) -> Result<Post, ApiError> {
    match posts.claim(id, identity.id).await? {
        ClaimOutcome::Claimed(post) => {
            info!(post_id = id, user_id = identity.id, "post claimed");
            Ok(post)
        }
        ClaimOutcome::AlreadyClaimed { owner_id } => {
            warn!(post_id = id, ?owner_id, actor = identity.id, "post already claimed");
            Err(
                ApiError::conflict("POST_ALREADY_CLAIMED", "Post already has an owner")
                    .with_details(json!({ "owner_id": owner_id })),
            )
        }
        ClaimOutcome::Missing => Err(ApiError::not_found("Post not found")),
    }
}

/// The guarded write matched nothing after the checks passed: the post was
/// deleted or claimed in between. Re-read to report which.
async fn lost_race(posts: &dyn PostStore, id: i64, identity: &AuthenticatedIdentity) -> ApiError {
    match posts.find(id).await {
        Ok(Some(details)) => match ensure_can_modify(&details.post, identity) {
            Err(e) => e,
            Ok(()) => ApiError::conflict("CONFLICT", "Post changed concurrently, retry"),
        },
        Ok(None) => ApiError::not_found("Post not found"),
        Err(e) => e.into(),
    }
}

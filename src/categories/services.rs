use tracing::{info, warn};

use super::{
    dto::CategoryRequest,
    repo::CategoryStore,
    repo_types::{Category, CategoryRemoval, NewCategory},
};
use crate::{
    db::StoreError,
    error::ApiError,
    validate::{optional_text, required_text},
};

fn validate(req: CategoryRequest) -> Result<NewCategory, ApiError> {
    Ok(NewCategory {
        name: required_text(req.name, "nombre")?,
        description: optional_text(req.description),
        image: optional_text(req.image),
    })
}

fn map_write_error(err: StoreError) -> ApiError {
    match err {
        StoreError::UniqueViolation { .. } => {
            ApiError::conflict("DUPLICATE_CATEGORY", "A category with that name already exists")
        }
        other => other.into(),
    }
}

pub async fn get(categories: &dyn CategoryStore, id: i64) -> Result<Category, ApiError> {
    categories
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))
}

pub async fn create(
    categories: &dyn CategoryStore,
    req: CategoryRequest,
) -> Result<Category, ApiError> {
    let new = validate(req)?;
    let category = categories.create(&new).await.map_err(map_write_error)?;
    info!(category_id = category.id, name = %category.name, "category created");
    Ok(category)
}

pub async fn update(
    categories: &dyn CategoryStore,
    id: i64,
    req: CategoryRequest,
) -> Result<Category, ApiError> {
    let changes = validate(req)?;
    categories
        .update(id, &changes)
        .await
        .map_err(map_write_error)?
        .ok_or_else(|| ApiError::not_found("Category not found"))
}

/// Refuses while any post still references the category.
pub async fn delete(categories: &dyn CategoryStore, id: i64) -> Result<(), ApiError> {
    match categories.delete(id).await? {
        CategoryRemoval::Deleted => {
            info!(category_id = id, "category deleted");
            Ok(())
        }
        CategoryRemoval::InUse { posts } => {
            warn!(category_id = id, posts, "category delete blocked");
            Err(category_in_use(posts))
        }
        CategoryRemoval::Missing => Err(ApiError::not_found("Category not found")),
    }
}

fn category_in_use(posts: i64) -> ApiError {
    ApiError::conflict(
        "CATEGORY_IN_USE",
        "Category is still referenced by posts",
    )
    .with_details(serde_json::json!({ "posts": posts }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::MemoryStore, posts::repo::PostStore, posts::repo_types::NewPost};
    use rust_decimal::Decimal;

    fn req(name: &str) -> CategoryRequest {
        CategoryRequest {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn duplicate_name_is_conflict() {
        let store = MemoryStore::default();
        create(&store, req("Books")).await.unwrap();
        let err = create(&store, req("Books")).await.unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_CATEGORY");
    }

    #[tokio::test]
    async fn blank_name_is_invalid() {
        let store = MemoryStore::default();
        let err = create(&store, req(" ")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn delete_blocked_while_posts_reference_it() {
        let store = MemoryStore::default();
        let cat = create(&store, req("Games")).await.unwrap();
        let post = PostStore::create(
            &store,
            None,
            &NewPost {
                title: "Chess".into(),
                description: "Wooden set".into(),
                price: Decimal::from(30),
                image: None,
                category_id: cat.id,
            },
        )
        .await
        .unwrap();

        let err = delete(&store, cat.id).await.unwrap_err();
        assert_eq!(err.code(), "CATEGORY_IN_USE");
        assert!(get(&store, cat.id).await.is_ok());
        let post_now = PostStore::find(&store, post.id).await.unwrap().unwrap();
        assert_eq!(post_now.post.category_id, Some(cat.id));

        PostStore::delete(&store, post.id, 1).await.unwrap();
        delete(&store, cat.id).await.unwrap();
        assert!(matches!(
            get(&store, cat.id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let store = MemoryStore::default();
        let err = delete(&store, 77).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_unknown_is_not_found() {
        let store = MemoryStore::default();
        let err = update(&store, 99, req("X")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}

use async_trait::async_trait;

use super::repo_types::{ClaimOutcome, NewPost, Post, PostDetails, PostFilter};
use crate::db::{Db, StoreError};

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Newest first, filtered by category and title/description substring.
    async fn list(&self, filter: &PostFilter) -> Result<Vec<PostDetails>, StoreError>;
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Post>, StoreError>;
    async fn find(&self, id: i64) -> Result<Option<PostDetails>, StoreError>;
    /// `owner_id = None` creates an unclaimed post. An unknown category is a
    /// `ForeignKeyViolation`.
    async fn create(&self, owner_id: Option<i64>, post: &NewPost) -> Result<Post, StoreError>;
    /// Applies only while the post is unclaimed or owned by `actor_id`;
    /// `None` otherwise (including when it does not exist).
    async fn update(
        &self,
        id: i64,
        actor_id: i64,
        post: &NewPost,
    ) -> Result<Option<Post>, StoreError>;
    /// Sets the owner only if there is none yet.
    async fn claim(&self, id: i64, user_id: i64) -> Result<ClaimOutcome, StoreError>;
    /// Removes the post's favorites, then the post, in one transaction, under
    /// the same ownership guard as `update`. Other references surface as
    /// `ForeignKeyViolation`.
    async fn delete(&self, id: i64, actor_id: i64) -> Result<bool, StoreError>;
}

const POST_COLUMNS: &str =
    "id, title, description, price, image, category_id, user_id, created_at, updated_at";

const DETAILS_SELECT: &str = r#"
    SELECT p.id, p.title, p.description, p.price, p.image, p.category_id, p.user_id,
           p.created_at, p.updated_at,
           c.name AS category_name,
           u.name AS owner_name
      FROM posts p
      LEFT JOIN categories c ON c.id = p.category_id
      LEFT JOIN users u ON u.id = p.user_id
"#;

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl PostStore for Db {
    async fn list(&self, filter: &PostFilter) -> Result<Vec<PostDetails>, StoreError> {
        let pattern = filter.search.as_deref().map(like_pattern);
        let rows = sqlx::query_as::<_, PostDetails>(&format!(
            r#"{DETAILS_SELECT}
             WHERE ($1::BIGINT IS NULL OR p.category_id = $1)
               AND ($2::TEXT IS NULL OR p.title ILIKE $2 OR p.description ILIKE $2)
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT $3 OFFSET $4"#
        ))
        .bind(filter.category_id)
        .bind(pattern)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Post>, StoreError> {
        let rows = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
              FROM posts
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: i64) -> Result<Option<PostDetails>, StoreError> {
        let row = sqlx::query_as::<_, PostDetails>(&format!("{DETAILS_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    async fn create(&self, owner_id: Option<i64>, post: &NewPost) -> Result<Post, StoreError> {
        let row = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (title, description, price, image, category_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.price)
        .bind(&post.image)
        .bind(post.category_id)
        .bind(owner_id)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        actor_id: i64,
        post: &NewPost,
    ) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
               SET title = $3, description = $4, price = $5, image = $6,
                   category_id = $7, updated_at = now()
             WHERE id = $1 AND (user_id IS NULL OR user_id = $2)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(actor_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.price)
        .bind(&post.image)
        .bind(post.category_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    async fn claim(&self, id: i64, user_id: i64) -> Result<ClaimOutcome, StoreError> {
        let claimed = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
               SET user_id = $2, updated_at = now()
             WHERE id = $1 AND user_id IS NULL
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        if let Some(post) = claimed {
            return Ok(ClaimOutcome::Claimed(post));
        }

        let current: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT user_id FROM posts WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(match current {
            Some((owner_id,)) => ClaimOutcome::AlreadyClaimed { owner_id },
            None => ClaimOutcome::Missing,
        })
    }

    async fn delete(&self, id: i64, actor_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool().begin().await?;

        let allowed: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT id FROM posts
             WHERE id = $1 AND (user_id IS NULL OR user_id = $2)
             FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(actor_id)
        .fetch_optional(&mut *tx)
        .await?;
        if allowed.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM favorites WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

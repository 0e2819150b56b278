use async_trait::async_trait;

use super::repo_types::FavoriteEntry;
use crate::db::{Db, StoreError};

#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Deletes the (user, post) row if present, inserts it otherwise, as one
    /// statement. Returns whether the row now exists. A concurrent insert of
    /// the same pair fails with `UniqueViolation`.
    async fn toggle(&self, user_id: i64, post_id: i64) -> Result<bool, StoreError>;
    async fn exists(&self, user_id: i64, post_id: i64) -> Result<bool, StoreError>;
    /// Newest first, ties broken by id.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<FavoriteEntry>, StoreError>;
}

#[async_trait]
impl FavoriteStore for Db {
    async fn toggle(&self, user_id: i64, post_id: i64) -> Result<bool, StoreError> {
        // Both CTEs see the same snapshot: the insert only runs when the delete
        // found nothing.
        let (added,): (bool,) = sqlx::query_as(
            r#"
            WITH removed AS (
                DELETE FROM favorites
                 WHERE user_id = $1 AND post_id = $2
                RETURNING id
            ), inserted AS (
                INSERT INTO favorites (user_id, post_id)
                SELECT $1, $2
                 WHERE NOT EXISTS (SELECT 1 FROM removed)
                RETURNING id
            )
            SELECT EXISTS (SELECT 1 FROM inserted)
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(self.pool())
        .await?;
        Ok(added)
    }

    async fn exists(&self, user_id: i64, post_id: i64) -> Result<bool, StoreError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(self.pool())
        .await?;
        Ok(exists)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<FavoriteEntry>, StoreError> {
        let rows = sqlx::query_as::<_, FavoriteEntry>(
            r#"
            SELECT f.id, f.post_id, f.created_at,
                   p.title, p.price, p.image, p.category_id,
                   c.name AS category_name
              FROM favorites f
              JOIN posts p ON p.id = f.post_id
              LEFT JOIN categories c ON c.id = p.category_id
             WHERE f.user_id = $1
             ORDER BY f.created_at DESC, f.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

use async_trait::async_trait;

use super::repo_types::{Category, CategoryRemoval, NewCategory};
use crate::db::{Db, StoreError};

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Category>, StoreError>;
    async fn find(&self, id: i64) -> Result<Option<Category>, StoreError>;
    /// Fails with `UniqueViolation` on a duplicate name.
    async fn create(&self, category: &NewCategory) -> Result<Category, StoreError>;
    async fn update(&self, id: i64, category: &NewCategory)
        -> Result<Option<Category>, StoreError>;
    /// Deletes only while no post references the category. The check and
    /// the delete happen under one row lock, so a post created concurrently
    /// either blocks the delete or fails its own foreign key.
    async fn delete(&self, id: i64) -> Result<CategoryRemoval, StoreError>;
}

const CATEGORY_COLUMNS: &str = "id, name, description, image, created_at";

#[async_trait]
impl CategoryStore for Db {
    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC, id ASC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: i64) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    async fn create(&self, category: &NewCategory) -> Result<Category, StoreError> {
        let row = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (name, description, image)
            VALUES ($1, $2, $3)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        category: &NewCategory,
    ) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories
               SET name = $2, description = $3, image = $4
             WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<CategoryRemoval, StoreError> {
        let mut tx = self.pool().begin().await?;

        // FOR UPDATE waits out inserts holding a key-share lock on the row.
        let locked: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(CategoryRemoval::Missing);
        }

        let (posts,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM posts WHERE category_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if posts > 0 {
            tx.rollback().await?;
            return Ok(CategoryRemoval::InUse { posts });
        }

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(CategoryRemoval::Deleted)
    }
}

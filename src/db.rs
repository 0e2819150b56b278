use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;

/// Owned handle to the Postgres pool. Opened once at startup, shared by every
/// store trait implementation, closed explicitly at shutdown.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn open(config: &AppConfig) -> anyhow::Result<Self> {
        Self::connect(&config.database_url, config.max_connections).await
    }

    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("connect to database")?;
        info!(max_connections, "database pool opened");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}

/// Store failures, with constraint violations split out so callers can turn
/// them into domain conflicts.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated ({constraint})")]
    UniqueViolation { constraint: String },
    #[error("foreign key constraint violated ({constraint})")]
    ForeignKeyViolation { constraint: String },
    #[error(transparent)]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn unique(constraint: impl Into<String>) -> Self {
        Self::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    pub fn foreign_key(constraint: impl Into<String>) -> Self {
        Self::ForeignKeyViolation {
            constraint: constraint.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return Self::UniqueViolation { constraint };
            }
            if db_err.is_foreign_key_violation() {
                return Self::ForeignKeyViolation { constraint };
            }
        }
        Self::Database(err)
    }
}

/// Migrated Postgres handle for store tests, or `None` when `DATABASE_URL`
/// is unset so those tests skip.
#[cfg(test)]
pub(crate) async fn test_db() -> Option<Db> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping Postgres-backed test");
        return None;
    };
    let db = Db::connect(&url, 40).await.expect("connect to DATABASE_URL");
    db.migrate().await.expect("migrate test database");
    Some(db)
}

/// A fresh user, category and owned post with names unique to this call.
/// Returns `(user_id, category_id, post_id)`.
#[cfg(test)]
pub(crate) async fn seed_post(db: &Db) -> (i64, i64, i64) {
    use crate::{
        auth::{repo::UserStore, repo_types::NewUser},
        categories::{repo::CategoryStore, repo_types::NewCategory},
        posts::{repo::PostStore, repo_types::NewPost},
    };

    let tag = uuid::Uuid::new_v4();
    let user = UserStore::create(
        db,
        &NewUser {
            name: "seed".into(),
            email: format!("{tag}@example.test"),
            password_hash: "not-a-real-hash".into(),
            image: None,
        },
    )
    .await
    .expect("seed user");
    let category = CategoryStore::create(
        db,
        &NewCategory {
            name: format!("seed-{tag}"),
            description: None,
            image: None,
        },
    )
    .await
    .expect("seed category");
    let post = PostStore::create(
        db,
        Some(user.id),
        &NewPost {
            title: "Seeded".into(),
            description: "row for store tests".into(),
            price: rust_decimal::Decimal::new(1250, 2),
            image: None,
            category_id: category.id,
        },
    )
    .await
    .expect("seed post");
    (user.id, category.id, post.id)
}

use std::sync::Arc;

use crate::auth::{jwt::JwtKeys, repo::UserStore};
use crate::categories::repo::CategoryStore;
use crate::config::AppConfig;
use crate::db::Db;
use crate::favorites::repo::FavoriteStore;
use crate::posts::repo::PostStore;
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub keys: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub posts: Arc<dyn PostStore>,
    pub favorites: Arc<dyn FavoriteStore>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init(config: &AppConfig, db: Db) -> anyhow::Result<Self> {
        // S3-compatible object storage (MinIO locally)
        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;
        Ok(Self::from_parts(config, db, storage))
    }

    pub fn from_parts(config: &AppConfig, db: Db, storage: Arc<dyn StorageClient>) -> Self {
        let db = Arc::new(db);
        Self {
            keys: JwtKeys::new(&config.jwt),
            users: db.clone(),
            categories: db.clone(),
            posts: db.clone(),
            favorites: db,
            storage,
        }
    }

    /// In-memory stores and a storage fake; no network or database.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::JwtConfig;
        use crate::memory::{FakeStorage, MemoryStore};

        let store = Arc::new(MemoryStore::default());
        Self {
            keys: JwtKeys::new(&JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            }),
            users: store.clone(),
            categories: store.clone(),
            posts: store.clone(),
            favorites: store,
            storage: Arc::new(FakeStorage::default()),
        }
    }
}

//! In-memory implementations of the store and storage traits for tests. They
//! enforce the same uniqueness and category/post references as the schema.
//! Owner ids are taken as given.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, ProfileChanges, User},
    },
    categories::{
        repo::CategoryStore,
        repo_types::{Category, CategoryRemoval, NewCategory},
    },
    db::StoreError,
    favorites::{repo::FavoriteStore, repo_types::FavoriteEntry},
    posts::{
        repo::PostStore,
        repo_types::{ClaimOutcome, NewPost, Post, PostDetails, PostFilter},
    },
    storage::StorageClient,
};

#[derive(Debug, Clone)]
struct FavoriteRow {
    id: i64,
    user_id: i64,
    post_id: i64,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    user_seq: i64,
    category_seq: i64,
    post_seq: i64,
    favorite_seq: i64,
    users: Vec<User>,
    categories: Vec<Category>,
    posts: Vec<Post>,
    favorites: Vec<FavoriteRow>,
    // post ids held by records outside this service (orders, carts)
    external_refs: Vec<i64>,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

impl Tables {
    fn details(&self, post: &Post) -> PostDetails {
        let category_name = post.category_id.and_then(|cid| {
            self.categories
                .iter()
                .find(|c| c.id == cid)
                .map(|c| c.name.clone())
        });
        let owner_name = post.user_id.and_then(|uid| {
            self.users
                .iter()
                .find(|u| u.id == uid)
                .map(|u| u.name.clone())
        });
        PostDetails {
            post: post.clone(),
            category_name,
            owner_name,
        }
    }

    fn category_exists(&self, id: i64) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }

    fn modifiable_post(&mut self, id: i64, actor_id: i64) -> Option<&mut Post> {
        self.posts
            .iter_mut()
            .find(|p| p.id == id && p.user_id.map_or(true, |owner| owner == actor_id))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store mutex poisoned")
    }

    /// Simulates a row in another table pointing at the post.
    pub fn add_external_reference(&self, post_id: i64) {
        self.lock().external_refs.push(post_id);
    }

    pub fn favorite_rows(&self, user_id: i64, post_id: i64) -> usize {
        self.lock()
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id && f.post_id == post_id)
            .count()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::unique("users_email_key"));
        }
        let row = User {
            id: next(&mut t.user_seq),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            image: user.image.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut t = self.lock();
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(image) = &changes.image {
            user.image = Some(image.clone());
        }
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let mut rows = self.lock().categories.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn find(&self, id: i64) -> Result<Option<Category>, StoreError> {
        Ok(self.lock().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, category: &NewCategory) -> Result<Category, StoreError> {
        let mut t = self.lock();
        if t.categories.iter().any(|c| c.name == category.name) {
            return Err(StoreError::unique("categories_name_key"));
        }
        let row = Category {
            id: next(&mut t.category_seq),
            name: category.name.clone(),
            description: category.description.clone(),
            image: category.image.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.categories.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        category: &NewCategory,
    ) -> Result<Option<Category>, StoreError> {
        let mut t = self.lock();
        if t
            .categories
            .iter()
            .any(|c| c.id != id && c.name == category.name)
        {
            return Err(StoreError::unique("categories_name_key"));
        }
        let Some(row) = t.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        row.name = category.name.clone();
        row.description = category.description.clone();
        row.image = category.image.clone();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<CategoryRemoval, StoreError> {
        let mut t = self.lock();
        if !t.category_exists(id) {
            return Ok(CategoryRemoval::Missing);
        }
        let posts = t.posts.iter().filter(|p| p.category_id == Some(id)).count() as i64;
        if posts > 0 {
            return Ok(CategoryRemoval::InUse { posts });
        }
        t.categories.retain(|c| c.id != id);
        Ok(CategoryRemoval::Deleted)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list(&self, filter: &PostFilter) -> Result<Vec<PostDetails>, StoreError> {
        let t = self.lock();
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut rows: Vec<&Post> = t
            .posts
            .iter()
            .filter(|p| filter.category_id.map_or(true, |c| p.category_id == Some(c)))
            .filter(|p| {
                needle.as_ref().map_or(true, |n| {
                    p.title.to_lowercase().contains(n) || p.description.to_lowercase().contains(n)
                })
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .map(|p| t.details(p))
            .collect())
    }

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Post>, StoreError> {
        let mut rows: Vec<Post> = self
            .lock()
            .posts
            .iter()
            .filter(|p| p.user_id == Some(user_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn find(&self, id: i64) -> Result<Option<PostDetails>, StoreError> {
        let t = self.lock();
        Ok(t.posts.iter().find(|p| p.id == id).map(|p| t.details(p)))
    }

    async fn create(&self, owner_id: Option<i64>, post: &NewPost) -> Result<Post, StoreError> {
        let mut t = self.lock();
        if !t.category_exists(post.category_id) {
            return Err(StoreError::foreign_key("posts_category_id_fkey"));
        }
        let now = OffsetDateTime::now_utc();
        let row = Post {
            id: next(&mut t.post_seq),
            title: post.title.clone(),
            description: post.description.clone(),
            price: post.price,
            image: post.image.clone(),
            category_id: Some(post.category_id),
            user_id: owner_id,
            created_at: now,
            updated_at: now,
        };
        t.posts.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        actor_id: i64,
        post: &NewPost,
    ) -> Result<Option<Post>, StoreError> {
        let mut t = self.lock();
        if !t.category_exists(post.category_id) {
            return Err(StoreError::foreign_key("posts_category_id_fkey"));
        }
        let Some(row) = t.modifiable_post(id, actor_id) else {
            return Ok(None);
        };
        row.title = post.title.clone();
        row.description = post.description.clone();
        row.price = post.price;
        row.image = post.image.clone();
        row.category_id = Some(post.category_id);
        row.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.clone()))
    }

    async fn claim(&self, id: i64, user_id: i64) -> Result<ClaimOutcome, StoreError> {
        let mut t = self.lock();
        let Some(row) = t.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(ClaimOutcome::Missing);
        };
        if row.user_id.is_some() {
            return Ok(ClaimOutcome::AlreadyClaimed {
                owner_id: row.user_id,
            });
        }
        row.user_id = Some(user_id);
        row.updated_at = OffsetDateTime::now_utc();
        Ok(ClaimOutcome::Claimed(row.clone()))
    }

    async fn delete(&self, id: i64, actor_id: i64) -> Result<bool, StoreError> {
        let mut t = self.lock();
        if t.modifiable_post(id, actor_id).is_none() {
            return Ok(false);
        }
        if t.external_refs.contains(&id) {
            return Err(StoreError::foreign_key("orders_post_id_fkey"));
        }
        t.favorites.retain(|f| f.post_id != id);
        t.posts.retain(|p| p.id != id);
        Ok(true)
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn toggle(&self, user_id: i64, post_id: i64) -> Result<bool, StoreError> {
        let mut t = self.lock();
        if let Some(pos) = t
            .favorites
            .iter()
            .position(|f| f.user_id == user_id && f.post_id == post_id)
        {
            t.favorites.remove(pos);
            return Ok(false);
        }
        if !t.posts.iter().any(|p| p.id == post_id) {
            return Err(StoreError::foreign_key("favorites_post_id_fkey"));
        }
        let row = FavoriteRow {
            id: next(&mut t.favorite_seq),
            user_id,
            post_id,
            created_at: OffsetDateTime::now_utc(),
        };
        t.favorites.push(row);
        Ok(true)
    }

    async fn exists(&self, user_id: i64, post_id: i64) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.post_id == post_id))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<FavoriteEntry>, StoreError> {
        let t = self.lock();
        let mut rows: Vec<FavoriteEntry> = t
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .filter_map(|f| {
                let post = t.posts.iter().find(|p| p.id == f.post_id)?;
                let category_name = t.details(post).category_name;
                Some(FavoriteEntry {
                    id: f.id,
                    post_id: post.id,
                    created_at: f.created_at,
                    title: post.title.clone(),
                    price: post.price,
                    image: post.image.clone(),
                    category_id: post.category_id,
                    category_name,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

/// Accepts every upload and remembers the keys.
#[derive(Default)]
pub struct FakeStorage {
    keys: Mutex<Vec<String>>,
}

impl FakeStorage {
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().expect("fake storage mutex poisoned").clone()
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, _body: Bytes, _ct: &str) -> anyhow::Result<()> {
        self.keys
            .lock()
            .expect("fake storage mutex poisoned")
            .push(key.to_string());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://fake.local/{key}")
    }
}

pub struct FailingStorage;

#[async_trait]
impl StorageClient for FailingStorage {
    async fn put_object(&self, key: &str, _body: Bytes, _ct: &str) -> anyhow::Result<()> {
        anyhow::bail!("provider rejected {key}")
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://failing.local/{key}")
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Listing row in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "precio", with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(rename = "imagen")]
    pub image: Option<String>,
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i64>, // set null when the category goes away
    #[serde(rename = "usuario_id")]
    pub user_id: Option<i64>, // None until claimed
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Post joined with the names clients display next to it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostDetails {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: Post,
    #[serde(rename = "categoria_nombre")]
    pub category_name: Option<String>,
    #[serde(rename = "usuario_nombre")]
    pub owner_name: Option<String>,
}

/// Validated create/update payload.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub category_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    Claimed(Post),
    AlreadyClaimed { owner_id: Option<i64> },
    Missing,
}

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Favorite joined with what the favorites page shows for its post.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FavoriteEntry {
    pub id: i64,
    pub post_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "precio", with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(rename = "imagen")]
    pub image: Option<String>,
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i64>,
    #[serde(rename = "categoria_nombre")]
    pub category_name: Option<String>,
}

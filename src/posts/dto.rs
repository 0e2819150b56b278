use serde::Deserialize;
use serde_json::Value;

/// Create/update body. Everything is optional here so that missing fields
/// become `InvalidInput` instead of a deserializer rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PostRequest {
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "precio")]
    pub price: Option<Value>,
    #[serde(rename = "imagen")]
    pub image: Option<String>,
    #[serde(rename = "categoria_id")]
    pub category_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "categoria_id")]
    pub category_id: Option<i64>,
    pub q: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde(alias = "postId")]
    pub post_id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub added: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    #[serde(rename = "isFavorite")]
    pub is_favorite: bool,
}

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryRequest {
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "imagen")]
    pub image: Option<String>,
}

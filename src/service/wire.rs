//! Request and response bodies exchanged with the generation service.

use serde::{Deserialize, Serialize};

use crate::types::Page;

/// Bulk generation request. Reference images travel as `data:` URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateImagesRequest {
    pub pages: Vec<Page>,
    pub task_id: Option<String>,
    pub full_outline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_images: Option<Vec<String>>,
    #[serde(default)]
    pub user_topic: String,
}

/// Single-page regeneration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateRequest {
    pub task_id: String,
    pub page: Page,
    pub use_reference: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_outline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerateResponse {
    pub success: bool,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineRequest {
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineResponse {
    pub success: bool,
    #[serde(default)]
    pub outline: Option<String>,
    #[serde(default)]
    pub pages: Option<Vec<Page>>,
    #[serde(default)]
    pub has_images: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub topic: String,
    pub outline: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub success: bool,
    #[serde(default)]
    pub titles: Option<Vec<String>>,
    #[serde(default)]
    pub copywriting: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Error body returned alongside non-success HTTP statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

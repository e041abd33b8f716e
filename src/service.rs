//! Generation Service Client
//!
//! Contract with the remote service that turns topics into outlines, outline
//! pages into images (streamed), and outlines into post content. The
//! orchestrator only talks to [`GenerationService`]; the reqwest implementation
//! lives in [`http`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::stream::ByteStream;
use crate::types::ReferenceImage;

pub mod http;
pub mod wire;

pub use http::HttpGenerationService;
pub use wire::{
    ContentRequest, ContentResponse, GenerateImagesRequest, OutlineRequest, OutlineResponse,
    RegenerateRequest, RegenerateResponse,
};

/// Connection settings for the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service origin, e.g. `http://127.0.0.1:5409`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix of the AI routes
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Deadline for single-exchange requests. The bulk stream has none.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum retries in flight when retrying all failed pages
    #[serde(default = "default_retry_concurrency")]
    pub retry_concurrency: usize,

    /// Regenerate with the cover image as style reference
    #[serde(default = "default_use_reference")]
    pub use_reference: bool,
}

pub(crate) fn default_base_url() -> String {
    "http://127.0.0.1:5409".to_string()
}

pub(crate) fn default_api_prefix() -> String {
    "/api/ai".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_retry_concurrency() -> usize {
    2
}

fn default_use_reference() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_concurrency: default_retry_concurrency(),
            use_reference: default_use_reference(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "Base URL must start with http:// or https:// (got '{}')",
                self.base_url
            ));
        }
        if self.retry_concurrency == 0 {
            return Err("Retry concurrency must be at least 1".to_string());
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err("Timeouts must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Remote generation service
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Turn a topic (and optional reference images) into an outline
    async fn generate_outline(
        &self,
        topic: &str,
        images: &[ReferenceImage],
    ) -> Result<OutlineResponse, ApiError>;

    /// Generate titles, copy and tags for a finished outline
    async fn generate_content(&self, topic: &str, outline: &str)
        -> Result<ContentResponse, ApiError>;

    /// Open the bulk image stream covering every page in `request`
    async fn open_image_stream(&self, request: &GenerateImagesRequest)
        -> Result<ByteStream, ApiError>;

    /// Regenerate a single page outside the bulk stream
    async fn regenerate_image(
        &self,
        request: &RegenerateRequest,
    ) -> Result<RegenerateResponse, ApiError>;

    /// URL of a stored image
    fn image_url(&self, task_id: &str, filename: &str, thumbnail: bool) -> String;

    /// Turn a service-relative URL into one that can be fetched directly
    fn resolve_url(&self, url: &str) -> String {
        url.to_string()
    }
}

//! reqwest-backed generation service client.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::service::wire::{
    ContentRequest, ContentResponse, ErrorBody, GenerateImagesRequest, OutlineRequest,
    OutlineResponse, RegenerateRequest, RegenerateResponse,
};
use crate::service::{GenerationService, ServiceConfig};
use crate::stream::ByteStream;
use crate::types::ReferenceImage;

/// Map transport-level reqwest errors to ApiError
pub(crate) fn map_http_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::RequestFailed(format!("Connection error: {}", error))
    } else if let Some(status) = error.status() {
        ApiError::RequestFailed(format!("Request failed with status {}: {}", status, error))
    } else {
        ApiError::ServiceError(format!("HTTP error: {}", error))
    }
}

/// Map a non-success status and its body to ApiError, preferring the service's
/// own `error` message when the body carries one.
pub(crate) fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| body.trim().to_string());
    if status.is_client_error() {
        ApiError::ServiceRejected(format!("{} ({})", message, status))
    } else {
        ApiError::RequestFailed(format!("Request failed with status {}: {}", status, message))
    }
}

/// Decode a JSON response, turning non-success statuses into errors.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(status_error(status, &body));
    }
    response
        .json()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
}

/// Client without a global deadline; single exchanges set their own.
pub(crate) fn build_http_client(config: &ServiceConfig) -> Result<Client, ApiError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .map_err(|e| ApiError::ServiceError(format!("Failed to create HTTP client: {}", e)))
}

/// Join origin, prefix and path without doubling slashes.
pub(crate) fn endpoint(config: &ServiceConfig, path: &str) -> String {
    format!(
        "{}/{}/{}",
        config.base_url.trim_end_matches('/'),
        config.api_prefix.trim_matches('/'),
        path.trim_start_matches('/')
    )
}

pub struct HttpGenerationService {
    client: Client,
    config: ServiceConfig,
}

impl HttpGenerationService {
    pub fn new(config: ServiceConfig) -> Result<Self, ApiError> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    fn outline_form(topic: &str, images: &[ReferenceImage]) -> Result<Form, ApiError> {
        let mut form = Form::new().text("topic", topic.to_string());
        for (i, image) in images.iter().enumerate() {
            let extension = image.mime.rsplit('/').next().unwrap_or("png");
            let part = Part::bytes(image.bytes.clone())
                .file_name(format!("reference_{}.{}", i, extension))
                .mime_str(&image.mime)
                .map_err(|e| ApiError::ServiceError(format!("Invalid image type: {}", e)))?;
            form = form.part("images", part);
        }
        Ok(form)
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn generate_outline(
        &self,
        topic: &str,
        images: &[ReferenceImage],
    ) -> Result<OutlineResponse, ApiError> {
        let url = endpoint(&self.config, "outline");
        let request = self.client.post(&url).timeout(self.request_timeout());
        let request = if images.is_empty() {
            request.json(&OutlineRequest {
                topic: topic.to_string(),
            })
        } else {
            request.multipart(Self::outline_form(topic, images)?)
        };
        debug!(url = %url, images = images.len(), "Requesting outline");
        let response = request.send().await.map_err(map_http_error)?;
        read_json(response).await
    }

    async fn generate_content(
        &self,
        topic: &str,
        outline: &str,
    ) -> Result<ContentResponse, ApiError> {
        let url = endpoint(&self.config, "content");
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout())
            .json(&ContentRequest {
                topic: topic.to_string(),
                outline: outline.to_string(),
            })
            .send()
            .await
            .map_err(map_http_error)?;
        read_json(response).await
    }

    async fn open_image_stream(
        &self,
        request: &GenerateImagesRequest,
    ) -> Result<ByteStream, ApiError> {
        let url = endpoint(&self.config, "generate");
        info!(url = %url, pages = request.pages.len(), "Opening generation stream");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, &body));
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ApiError::StreamFailed(format!("Failed to read stream: {}", e)))
        });
        Ok(Box::pin(body))
    }

    async fn regenerate_image(
        &self,
        request: &RegenerateRequest,
    ) -> Result<RegenerateResponse, ApiError> {
        let url = endpoint(&self.config, "regenerate");
        debug!(url = %url, index = request.page.index, "Requesting regeneration");
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout())
            .json(request)
            .send()
            .await
            .map_err(map_http_error)?;
        read_json(response).await
    }

    fn image_url(&self, task_id: &str, filename: &str, thumbnail: bool) -> String {
        format!(
            "{}?thumbnail={}",
            endpoint(&self.config, &format!("images/{}/{}", task_id, filename)),
            thumbnail
        )
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

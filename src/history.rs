//! History Repository
//!
//! Durable records of past and ongoing tasks, kept by the service and keyed by
//! record id. The orchestrator writes to it at stage boundaries; the store is
//! never its sole source of truth.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::service::http::{build_http_client, endpoint, map_http_error, read_json, status_error};
use crate::service::ServiceConfig;
use crate::types::Outline;

/// Record statuses written by this client.
pub mod status {
    pub const DRAFT: &str = "draft";
    pub const GENERATING: &str = "generating";
    pub const COMPLETED: &str = "completed";
    pub const PARTIAL: &str = "partial";
}

/// Summary row of the history list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    pub status: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub page_count: usize,
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryImages {
    #[serde(default)]
    pub task_id: Option<String>,
    /// File names of generated images.
    #[serde(default)]
    pub generated: Vec<String>,
}

/// Full record with outline and generated files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryDetail {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub outline: Outline,
    #[serde(default)]
    pub images: HistoryImages,
    pub status: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub records: Vec<HistoryRecord>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Partial update; absent fields are left untouched by the service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<HistoryImages>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// History collaborator
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Create a record and return its id
    async fn create(
        &self,
        topic: &str,
        outline: &Outline,
        task_id: Option<&str>,
    ) -> Result<String, ApiError>;

    async fn get(&self, record_id: &str) -> Result<HistoryDetail, ApiError>;

    async fn update(&self, record_id: &str, update: &HistoryUpdate) -> Result<(), ApiError>;

    async fn delete(&self, record_id: &str) -> Result<(), ApiError>;

    /// List records, newest first. `page` is 1-based.
    async fn list(
        &self,
        page: usize,
        page_size: usize,
        status: Option<&str>,
    ) -> Result<HistoryPage, ApiError>;
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    topic: &'a str,
    outline: &'a Outline,
    task_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct Ack {
    success: bool,
    #[serde(default)]
    record_id: Option<String>,
    #[serde(default)]
    record: Option<HistoryDetail>,
    #[serde(default)]
    error: Option<String>,
}

impl Ack {
    fn ensure_success(&self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::ServiceRejected(
                self.error
                    .clone()
                    .unwrap_or_else(|| "history request failed".to_string()),
            ))
        }
    }
}

#[derive(Deserialize)]
struct ListResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    page: Option<HistoryPage>,
}

pub struct HttpHistoryRepository {
    client: Client,
    config: ServiceConfig,
}

impl HttpHistoryRepository {
    pub fn new(config: ServiceConfig) -> Result<Self, ApiError> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    fn record_url(&self, record_id: &str) -> String {
        endpoint(&self.config, &format!("history/{}", record_id))
    }

    fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.request_timeout_secs)
    }

    async fn send_for_ack(
        &self,
        request: reqwest::RequestBuilder,
        record_id: &str,
    ) -> Result<Ack, ApiError> {
        let response = request
            .timeout(self.timeout())
            .send()
            .await
            .map_err(map_http_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::HistoryRecordNotFound(record_id.to_string()));
        }
        let ack: Ack = read_json(response).await?;
        ack.ensure_success()?;
        Ok(ack)
    }
}

#[async_trait]
impl HistoryRepository for HttpHistoryRepository {
    async fn create(
        &self,
        topic: &str,
        outline: &Outline,
        task_id: Option<&str>,
    ) -> Result<String, ApiError> {
        let request = self
            .client
            .post(endpoint(&self.config, "history"))
            .json(&CreateRequest {
                topic,
                outline,
                task_id,
            });
        let ack = self.send_for_ack(request, "").await?;
        let record_id = ack
            .record_id
            .ok_or_else(|| ApiError::InvalidResponse("history create returned no record_id".to_string()))?;
        debug!(record_id = %record_id, "History record created");
        Ok(record_id)
    }

    async fn get(&self, record_id: &str) -> Result<HistoryDetail, ApiError> {
        let request = self.client.get(self.record_url(record_id));
        let ack = self.send_for_ack(request, record_id).await?;
        ack.record
            .ok_or_else(|| ApiError::HistoryRecordNotFound(record_id.to_string()))
    }

    async fn update(&self, record_id: &str, update: &HistoryUpdate) -> Result<(), ApiError> {
        let request = self.client.put(self.record_url(record_id)).json(update);
        self.send_for_ack(request, record_id).await?;
        Ok(())
    }

    async fn delete(&self, record_id: &str) -> Result<(), ApiError> {
        let request = self.client.delete(self.record_url(record_id));
        self.send_for_ack(request, record_id).await?;
        Ok(())
    }

    async fn list(
        &self,
        page: usize,
        page_size: usize,
        status: Option<&str>,
    ) -> Result<HistoryPage, ApiError> {
        let mut query = vec![
            ("page", page.max(1).to_string()),
            ("page_size", page_size.max(1).to_string()),
        ];
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        let response = self
            .client
            .get(endpoint(&self.config, "history"))
            .query(&query)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(map_http_error)?;
        let status_code = response.status();
        if !status_code.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status_code, &body));
        }
        let list: ListResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse history list: {}", e)))?;
        if !list.success {
            return Err(ApiError::ServiceRejected(
                list.error.unwrap_or_else(|| "history list failed".to_string()),
            ));
        }
        list.page
            .ok_or_else(|| ApiError::InvalidResponse("history list missing records".to_string()))
    }
}

//! Scripted collaborators for orchestrator tests.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;

use crate::error::ApiError;
use crate::history::{HistoryDetail, HistoryPage, HistoryRepository, HistoryUpdate};
use crate::service::{
    ContentResponse, GenerateImagesRequest, GenerationService, OutlineResponse, RegenerateRequest,
    RegenerateResponse,
};
use crate::stream::{byte_stream_from_chunks, ByteStream};
use crate::types::{Outline, ReferenceImage};

pub fn record(event: &str, data: &str) -> Vec<u8> {
    format!("event: {event}\ndata: {data}\n\n").into_bytes()
}

pub fn done(index: usize) -> Vec<u8> {
    record(
        "progress",
        &format!(
            r#"{{"index":{index},"status":"done","image_url":"/api/ai/images/task_1/{index}.png"}}"#
        ),
    )
}

pub fn failed(index: usize, message: &str) -> Vec<u8> {
    record(
        "error",
        &format!(r#"{{"index":{index},"status":"error","message":"{message}"}}"#),
    )
}

pub fn finish(total: usize, failed_indices: &[usize]) -> Vec<u8> {
    let completed = total - failed_indices.len();
    let images: Vec<String> = (0..total)
        .filter(|i| !failed_indices.contains(i))
        .map(|i| format!("\"{i}.png\""))
        .collect();
    let failed: Vec<String> = failed_indices.iter().map(|i| i.to_string()).collect();
    record(
        "finish",
        &format!(
            r#"{{"success":{},"task_id":"task_1","images":[{}],"total":{total},"completed":{completed},"failed":{},"failed_indices":[{}]}}"#,
            failed_indices.is_empty(),
            images.join(","),
            failed_indices.len(),
            failed.join(",")
        ),
    )
}

pub enum StreamScript {
    Chunks(Vec<Vec<u8>>),
    ChunksThenError(Vec<Vec<u8>>, String),
    OpenError(String),
}

#[derive(Default)]
pub struct ScriptedService {
    pub outline: Mutex<Option<Result<OutlineResponse, String>>>,
    pub content: Mutex<Option<Result<ContentResponse, String>>>,
    pub stream: Mutex<Option<StreamScript>>,
    /// Per-index regeneration results. Indices without an entry succeed.
    pub regenerate: Mutex<HashMap<usize, Result<RegenerateResponse, String>>>,
    pub stream_requests: Mutex<Vec<GenerateImagesRequest>>,
    pub regenerate_requests: Mutex<Vec<RegenerateRequest>>,
    pub outline_images: Mutex<usize>,
}

impl ScriptedService {
    pub fn with_stream(script: StreamScript) -> Self {
        let service = Self::default();
        *service.stream.lock() = Some(script);
        service
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate_outline(
        &self,
        _topic: &str,
        images: &[ReferenceImage],
    ) -> Result<OutlineResponse, ApiError> {
        *self.outline_images.lock() = images.len();
        match self.outline.lock().take() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ApiError::RequestFailed(message)),
            None => Err(ApiError::ServiceError("no outline scripted".to_string())),
        }
    }

    async fn generate_content(
        &self,
        _topic: &str,
        _outline: &str,
    ) -> Result<ContentResponse, ApiError> {
        match self.content.lock().take() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ApiError::RequestFailed(message)),
            None => Err(ApiError::ServiceError("no content scripted".to_string())),
        }
    }

    async fn open_image_stream(
        &self,
        request: &GenerateImagesRequest,
    ) -> Result<ByteStream, ApiError> {
        self.stream_requests.lock().push(request.clone());
        match self.stream.lock().take() {
            Some(StreamScript::Chunks(chunks)) => Ok(byte_stream_from_chunks(chunks)),
            Some(StreamScript::ChunksThenError(chunks, message)) => {
                let items: Vec<Result<Vec<u8>, ApiError>> = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(ApiError::StreamFailed(message))))
                    .collect();
                Ok(Box::pin(stream::iter(items)))
            }
            Some(StreamScript::OpenError(message)) => Err(ApiError::RequestFailed(message)),
            None => Err(ApiError::ServiceError("no stream scripted".to_string())),
        }
    }

    async fn regenerate_image(
        &self,
        request: &RegenerateRequest,
    ) -> Result<RegenerateResponse, ApiError> {
        self.regenerate_requests.lock().push(request.clone());
        let index = request.page.index;
        match self.regenerate.lock().remove(&index) {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ApiError::RequestFailed(message)),
            None => Ok(RegenerateResponse {
                success: true,
                index: Some(index),
                image_url: Some(format!(
                    "/api/ai/images/{}/{}.png",
                    request.task_id, index
                )),
                error: None,
            }),
        }
    }

    fn image_url(&self, task_id: &str, filename: &str, thumbnail: bool) -> String {
        format!("/api/ai/images/{task_id}/{filename}?thumbnail={thumbnail}")
    }
}

#[derive(Default)]
pub struct RecordingHistory {
    pub created: Mutex<Vec<(String, Outline, Option<String>)>>,
    pub updates: Mutex<Vec<(String, HistoryUpdate)>>,
    pub deleted: Mutex<Vec<String>>,
    pub details: Mutex<HashMap<String, HistoryDetail>>,
    pub fail_writes: bool,
}

#[async_trait]
impl HistoryRepository for RecordingHistory {
    async fn create(
        &self,
        topic: &str,
        outline: &Outline,
        task_id: Option<&str>,
    ) -> Result<String, ApiError> {
        if self.fail_writes {
            return Err(ApiError::RequestFailed("history offline".to_string()));
        }
        let mut created = self.created.lock();
        created.push((
            topic.to_string(),
            outline.clone(),
            task_id.map(str::to_string),
        ));
        Ok(format!("record-{}", created.len()))
    }

    async fn get(&self, record_id: &str) -> Result<HistoryDetail, ApiError> {
        self.details
            .lock()
            .get(record_id)
            .cloned()
            .ok_or_else(|| ApiError::HistoryRecordNotFound(record_id.to_string()))
    }

    async fn update(&self, record_id: &str, update: &HistoryUpdate) -> Result<(), ApiError> {
        if self.fail_writes {
            return Err(ApiError::RequestFailed("history offline".to_string()));
        }
        self.updates
            .lock()
            .push((record_id.to_string(), update.clone()));
        Ok(())
    }

    async fn delete(&self, record_id: &str) -> Result<(), ApiError> {
        self.deleted.lock().push(record_id.to_string());
        Ok(())
    }

    async fn list(
        &self,
        page: usize,
        page_size: usize,
        _status: Option<&str>,
    ) -> Result<HistoryPage, ApiError> {
        Ok(HistoryPage {
            records: Vec::new(),
            total: 0,
            page,
            page_size,
            total_pages: 0,
        })
    }
}

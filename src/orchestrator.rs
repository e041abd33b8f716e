//! Generation Orchestrator
//!
//! Drives one task through its stages against the remote service: outline
//! creation, the bulk image stream, single and bulk retries, content
//! generation, and loading finished tasks from history. All state changes go
//! through [`GenerationStateStore`] on the caller's task; the orchestrator
//! itself holds no task state.

pub mod apply;
pub mod history_sync;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use apply::{apply_event, UNSPECIFIED_FAILURE};
pub use history_sync::history_update;
pub use retry::RetrySummary;

use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::history::{HistoryPage, HistoryRepository};
use crate::service::{GenerateImagesRequest, GenerationService, ServiceConfig};
use crate::store::{parse_outline, reindex, GenerationStateStore};
use crate::stream::{decode_stream, FinishEvent, StreamEvent};
use crate::types::{GeneratedImage, ImageStatus, Outline, Page, ReferenceImage};

/// Error recorded for pages a loaded history record has no image for.
pub const NOT_GENERATED: &str = "not generated";

/// Receives run activity as it is applied.
pub trait RunObserver {
    /// Called after `event` has been applied to `store`.
    fn on_event(&mut self, _event: &StreamEvent, _store: &GenerationStateStore) {}

    /// Called once when the stream cannot be opened or read.
    fn on_stream_error(&mut self, _error: &ApiError) {}
}

pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Inputs of a bulk run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub pages: Vec<Page>,
    pub prior_task_id: Option<String>,
    pub full_outline: String,
    pub user_images: Vec<ReferenceImage>,
    pub user_topic: Option<String>,
}

impl RunRequest {
    /// Request covering the store's active outline.
    pub fn from_store(store: &GenerationStateStore) -> Self {
        let topic = store.topic();
        Self {
            pages: store.pages().to_vec(),
            prior_task_id: store.task_id().map(str::to_string),
            full_outline: store.outline().raw.clone(),
            user_images: store.user_images().to_vec(),
            user_topic: (!topic.is_empty()).then(|| topic.to_string()),
        }
    }

    /// Wire form. Reference images are inlined as `data:` URLs.
    pub fn to_wire(&self) -> GenerateImagesRequest {
        let user_images = (!self.user_images.is_empty()).then(|| {
            self.user_images
                .iter()
                .map(ReferenceImage::to_data_url)
                .collect()
        });
        GenerateImagesRequest {
            pages: self.pages.clone(),
            task_id: self.prior_task_id.clone(),
            full_outline: self.full_outline.clone(),
            user_images,
            user_topic: self.user_topic.clone().unwrap_or_default(),
        }
    }
}

/// How a bulk run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The service sent its `finish` event.
    Finished(FinishEvent),
    /// The stream closed cleanly before `finish`. The task stays in the
    /// generating stage with the last observed image statuses.
    Stalled {
        completed: usize,
        failed: usize,
        pending: usize,
    },
    /// The stream could not be opened or broke while reading.
    StreamFailed(ApiError),
}

impl RunOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunOutcome::Finished(_))
    }
}

pub struct GenerationOrchestrator {
    service: Arc<dyn GenerationService>,
    history: Option<Arc<dyn HistoryRepository>>,
    retry_concurrency: usize,
    use_reference: bool,
}

impl GenerationOrchestrator {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        let defaults = ServiceConfig::default();
        Self {
            service,
            history: None,
            retry_concurrency: defaults.retry_concurrency,
            use_reference: defaults.use_reference,
        }
    }

    /// Orchestrator using the retry settings of `config`.
    pub fn from_config(
        service: Arc<dyn GenerationService>,
        history: Option<Arc<dyn HistoryRepository>>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            service,
            history,
            retry_concurrency: config.retry_concurrency.max(1),
            use_reference: config.use_reference,
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryRepository>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_retry_concurrency(mut self, limit: usize) -> Self {
        self.retry_concurrency = limit.max(1);
        self
    }

    pub fn service(&self) -> &dyn GenerationService {
        self.service.as_ref()
    }

    /// Default for whether retries use the cover as style reference.
    pub fn use_reference(&self) -> bool {
        self.use_reference
    }

    fn history(&self) -> Result<&Arc<dyn HistoryRepository>, ApiError> {
        self.history
            .as_ref()
            .ok_or_else(|| ApiError::ConfigError("History is not configured".to_string()))
    }

    /// Start a new task from `topic`, using the store's reference images.
    /// Supersedes the active task.
    pub async fn create_outline(
        &self,
        store: &mut GenerationStateStore,
        topic: &str,
    ) -> Result<(), ApiError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ApiError::InvalidState("Topic cannot be empty".to_string()));
        }

        let user_images = store.user_images().to_vec();
        store.reset();
        store.set_user_images(user_images);
        store.set_topic(topic);

        let response = self
            .service
            .generate_outline(topic, store.user_images())
            .await?;
        if !response.success {
            return Err(ApiError::ServiceRejected(
                response
                    .error
                    .unwrap_or_else(|| "Outline generation failed".to_string()),
            ));
        }

        let raw = response.outline.unwrap_or_default();
        let pages = match response.pages {
            Some(pages) if !pages.is_empty() => pages,
            _ => parse_outline(&raw),
        };
        if pages.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Outline contains no pages".to_string(),
            ));
        }
        info!(pages = pages.len(), "Outline created");
        store.set_outline(raw, pages);
        self.create_history_record(store).await;
        Ok(())
    }

    /// Start a new task from a locally authored outline. Returns the page count.
    pub async fn import_outline(
        &self,
        store: &mut GenerationStateStore,
        topic: &str,
        raw: &str,
    ) -> Result<usize, ApiError> {
        let pages = parse_outline(raw);
        if pages.is_empty() {
            return Err(ApiError::InvalidState(
                "Outline contains no pages".to_string(),
            ));
        }
        let count = pages.len();
        store.reset();
        store.set_topic(topic.trim());
        store.set_outline(raw.trim(), pages);
        info!(pages = count, "Outline imported");
        self.create_history_record(store).await;
        Ok(count)
    }

    /// Push outline edits to the task's history record.
    pub async fn save_outline(&self, store: &GenerationStateStore) {
        self.sync_history(store).await;
    }

    /// Run the bulk stream for `request` and apply every event as it arrives.
    ///
    /// Returns `Err` only when the run cannot start. Stream trouble is reported
    /// through the outcome and `observer`.
    pub async fn start_run(
        &self,
        store: &mut GenerationStateStore,
        request: RunRequest,
        observer: &mut dyn RunObserver,
    ) -> Result<RunOutcome, ApiError> {
        if request.pages.is_empty() {
            return Err(ApiError::InvalidState(
                "Outline has no pages to generate".to_string(),
            ));
        }
        if request.pages != store.pages() {
            return Err(ApiError::InvalidState(
                "Run pages do not match the active outline".to_string(),
            ));
        }

        store.start_generation();
        let wire = request.to_wire();
        let body = match self.service.open_image_stream(&wire).await {
            Ok(body) => body,
            Err(e) => return Ok(Self::stream_failed(store, e, observer)),
        };

        let mut events = decode_stream(body);
        let mut finished: Option<FinishEvent> = None;
        while let Some(next) = events.next().await {
            match next {
                Ok(event) => {
                    apply_event(store, &event);
                    observer.on_event(&event, store);
                    if let StreamEvent::Finish(finish) = event {
                        finished = Some(finish);
                    }
                }
                Err(e) if finished.is_some() => {
                    warn!(error = %e, "Stream failed after finish");
                }
                Err(e) => return Ok(Self::stream_failed(store, e, observer)),
            }
        }

        match finished {
            Some(finish) => {
                self.sync_history(store).await;
                Ok(RunOutcome::Finished(finish))
            }
            None => {
                let completed = store.completed_count();
                let failed = store.failed_count();
                let pending = store.images().len().saturating_sub(completed + failed);
                warn!(completed, failed, pending, "Stream closed before finish");
                Ok(RunOutcome::Stalled {
                    completed,
                    failed,
                    pending,
                })
            }
        }
    }

    /// Run the bulk stream over the store's active outline.
    pub async fn generate(
        &self,
        store: &mut GenerationStateStore,
        observer: &mut dyn RunObserver,
    ) -> Result<RunOutcome, ApiError> {
        let request = RunRequest::from_store(store);
        self.start_run(store, request, observer).await
    }

    fn stream_failed(
        store: &mut GenerationStateStore,
        error: ApiError,
        observer: &mut dyn RunObserver,
    ) -> RunOutcome {
        warn!(error = %error, "Generation stream failed");
        store.mark_stream_failed();
        observer.on_stream_error(&error);
        RunOutcome::StreamFailed(error)
    }

    /// Pages whose image failed, in ascending index order.
    pub fn failed_items(&self, store: &GenerationStateStore) -> Vec<Page> {
        store.failed_pages()
    }

    /// Generate titles, copy and tags for the active outline.
    pub async fn generate_content(&self, store: &mut GenerationStateStore) -> Result<(), ApiError> {
        if store.pages().is_empty() {
            return Err(ApiError::InvalidState(
                "No outline to write content for".to_string(),
            ));
        }
        store.start_content_generation();
        let topic = store.topic().to_string();
        let outline = store.outline().raw.clone();
        match self.service.generate_content(&topic, &outline).await {
            Ok(response) if response.success => {
                store.set_content(
                    response.titles.unwrap_or_default(),
                    response.copywriting.unwrap_or_default(),
                    response.tags.unwrap_or_default(),
                );
                self.sync_history(store).await;
                Ok(())
            }
            Ok(response) => {
                let message = response
                    .error
                    .unwrap_or_else(|| "Content generation failed".to_string());
                store.set_content_error(message.clone());
                Err(ApiError::ServiceRejected(message))
            }
            Err(e) => {
                store.set_content_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Replace the active task with a history record.
    pub async fn load_history_record(
        &self,
        store: &mut GenerationStateStore,
        record_id: &str,
    ) -> Result<(), ApiError> {
        let detail = self.history()?.get(record_id).await?;
        let task_id = detail.images.task_id.clone();
        let pages = reindex(detail.outline.pages);

        let images = pages
            .iter()
            .map(|page| {
                let filename = format!("{}.png", page.index);
                match &task_id {
                    Some(task_id) if detail.images.generated.contains(&filename) => {
                        GeneratedImage {
                            index: page.index,
                            url: self.service.image_url(task_id, &filename, false),
                            status: ImageStatus::Done,
                            error: None,
                        }
                    }
                    _ => GeneratedImage {
                        index: page.index,
                        url: String::new(),
                        status: ImageStatus::Error,
                        error: Some(NOT_GENERATED.to_string()),
                    },
                }
            })
            .collect();

        info!(record_id = %detail.id, "Loaded history record");
        store.load_record(
            detail.title,
            Outline {
                raw: detail.outline.raw,
                pages,
            },
            task_id,
            detail.id,
            images,
        );
        Ok(())
    }

    pub async fn list_history(
        &self,
        page: usize,
        page_size: usize,
        status: Option<&str>,
    ) -> Result<HistoryPage, ApiError> {
        self.history()?.list(page, page_size, status).await
    }

    /// Delete a history record, detaching the active task if it points at it.
    pub async fn delete_history_record(
        &self,
        store: &mut GenerationStateStore,
        record_id: &str,
    ) -> Result<(), ApiError> {
        self.history()?.delete(record_id).await?;
        if store.record_id() == Some(record_id) {
            store.set_record_id(None);
        }
        Ok(())
    }
}

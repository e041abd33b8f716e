//! Single-page regeneration outside the bulk stream.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::GenerationOrchestrator;
use crate::error::ApiError;
use crate::service::{RegenerateRequest, RegenerateResponse};
use crate::store::{GenerationStateStore, MISSING_URL_ERROR};
use crate::types::{ImageStatus, Page};

/// Result of retrying every failed page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrySummary {
    pub succeeded: Vec<usize>,
    /// Index and error message of each retry that failed again.
    pub failed: Vec<(usize, String)>,
}

impl RetrySummary {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

impl GenerationOrchestrator {
    /// Regenerate one page and return its new image URL.
    ///
    /// The image is marked `retrying` before the request goes out, so a second
    /// retry of the same index is refused until this one completes.
    pub async fn retry_image(
        &self,
        store: &mut GenerationStateStore,
        index: usize,
        use_reference: bool,
    ) -> Result<String, ApiError> {
        let task_id = active_task_id(store)?;
        let page = store
            .page(index)
            .cloned()
            .ok_or(ApiError::PageNotFound(index))?;
        match store.image(index) {
            None => return Err(ApiError::PageNotFound(index)),
            Some(image) if image.status == ImageStatus::Retrying => {
                return Err(ApiError::RetryInFlight(index));
            }
            Some(_) => {}
        }

        store.set_image_retrying(index)?;
        let request = regenerate_request(store, task_id, page, use_reference);
        let result = self.service.regenerate_image(&request).await;
        let outcome = apply_retry_result(store, index, result);
        self.sync_history(store).await;
        outcome
    }

    /// Retry every failed page with bounded concurrency, applying each result
    /// as it completes.
    pub async fn retry_failed(
        &self,
        store: &mut GenerationStateStore,
        use_reference: bool,
    ) -> Result<RetrySummary, ApiError> {
        let failed_pages = store.failed_pages();
        if failed_pages.is_empty() {
            return Ok(RetrySummary::default());
        }
        let task_id = active_task_id(store)?;

        let mut requests = Vec::with_capacity(failed_pages.len());
        for page in failed_pages {
            store.set_image_retrying(page.index)?;
            requests.push(regenerate_request(store, task_id.clone(), page, use_reference));
        }
        info!(
            count = requests.len(),
            concurrency = self.retry_concurrency,
            "Retrying failed images"
        );

        let service = &self.service;
        let mut completions = stream::iter(requests)
            .map(|request| async move {
                let result = service.regenerate_image(&request).await;
                (request.page.index, result)
            })
            .buffer_unordered(self.retry_concurrency);

        let mut summary = RetrySummary::default();
        while let Some((index, result)) = completions.next().await {
            match apply_retry_result(store, index, result) {
                Ok(_) => summary.succeeded.push(index),
                Err(e) => summary.failed.push((index, e.to_string())),
            }
        }
        summary.succeeded.sort_unstable();
        summary.failed.sort_by_key(|(index, _)| *index);

        self.sync_history(store).await;
        Ok(summary)
    }
}

fn active_task_id(store: &GenerationStateStore) -> Result<String, ApiError> {
    store
        .task_id()
        .map(str::to_string)
        .ok_or_else(|| ApiError::NoTask("No generation task to retry against".to_string()))
}

fn regenerate_request(
    store: &GenerationStateStore,
    task_id: String,
    page: Page,
    use_reference: bool,
) -> RegenerateRequest {
    let outline = &store.outline().raw;
    let topic = store.topic();
    RegenerateRequest {
        task_id,
        page,
        use_reference,
        full_outline: (!outline.is_empty()).then(|| outline.clone()),
        user_topic: (!topic.is_empty()).then(|| topic.to_string()),
    }
}

fn apply_retry_result(
    store: &mut GenerationStateStore,
    index: usize,
    result: Result<RegenerateResponse, ApiError>,
) -> Result<String, ApiError> {
    match result {
        Ok(response) if response.success => {
            match response.image_url.filter(|url| !url.is_empty()) {
                Some(url) => {
                    let url = store.update_image(index, &url)?;
                    info!(index, "Image regenerated");
                    Ok(url)
                }
                None => {
                    store.set_image_error(index, MISSING_URL_ERROR)?;
                    Err(ApiError::InvalidResponse(
                        "Regeneration returned no image url".to_string(),
                    ))
                }
            }
        }
        Ok(response) => {
            let message = response
                .error
                .unwrap_or_else(|| "Regeneration failed".to_string());
            warn!(index, error = %message, "Regeneration rejected");
            store.set_image_error(index, message.clone())?;
            Err(ApiError::ServiceRejected(message))
        }
        Err(e) => {
            warn!(index, error = %e, "Regeneration request failed");
            store.set_image_error(index, e.to_string())?;
            Err(e)
        }
    }
}

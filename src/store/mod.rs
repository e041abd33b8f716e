//! Generation State Store
//!
//! Single owner of the active task. All changes go through named operations,
//! and every operation ends by writing the persisted subset to the injected
//! [`SnapshotStorage`]. Persistence failures are logged and never abort a
//! mutation; the in-memory state stays authoritative.

pub mod outline;
pub mod persistence;
pub mod snapshot;

pub use outline::{join_pages, parse_outline, reindex, PAGE_DELIMITER};
pub use persistence::{MemorySnapshotStorage, SledSnapshotStorage, SnapshotStorage, SNAPSHOT_KEY};
pub use snapshot::Snapshot;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::types::{
    ContentStatus, GeneratedContent, GeneratedImage, ImageStatus, Outline, Page, PageType,
    Progress, ProgressStatus, ReferenceImage, Stage,
};

/// Message recorded when the service reports `done` without ever supplying a URL.
pub const MISSING_URL_ERROR: &str = "completed without an image url";

/// Message recorded for a retry that was still in flight when the state was
/// last saved.
pub const INTERRUPTED_RETRY_ERROR: &str = "retry interrupted";

pub struct GenerationStateStore {
    stage: Stage,
    topic: String,
    outline: Outline,
    progress: Progress,
    images: Vec<GeneratedImage>,
    task_id: Option<String>,
    record_id: Option<String>,
    content: GeneratedContent,
    user_images: Vec<ReferenceImage>,
    storage: Arc<dyn SnapshotStorage>,
    last_cache_token: u64,
}

impl GenerationStateStore {
    /// Restore the persisted snapshot, or start empty if there is none or it
    /// cannot be read. A retry never outlives the process that started it, so
    /// restored `retrying` images come back as `error`.
    pub fn open(storage: Arc<dyn SnapshotStorage>) -> Self {
        let mut snapshot = match storage.read() {
            Ok(Some(bytes)) => match Snapshot::from_bytes(&bytes) {
                Ok(snapshot) => {
                    debug!(stage = snapshot.stage.as_str(), "Restored generator state");
                    snapshot
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed generator state");
                    Snapshot::default()
                }
            },
            Ok(None) => Snapshot::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load generator state");
                Snapshot::default()
            }
        };
        let interrupted = release_interrupted_retries(&mut snapshot.images);
        let store = Self::from_snapshot(snapshot, storage);
        if interrupted > 0 {
            warn!(count = interrupted, "Restored interrupted retries as failed");
            store.persist();
        }
        store
    }

    fn from_snapshot(snapshot: Snapshot, storage: Arc<dyn SnapshotStorage>) -> Self {
        Self {
            stage: snapshot.stage,
            topic: snapshot.topic,
            outline: snapshot.outline,
            progress: snapshot.progress,
            images: snapshot.images,
            task_id: snapshot.task_id,
            record_id: snapshot.record_id,
            content: snapshot.content,
            user_images: Vec::new(),
            storage,
            last_cache_token: 0,
        }
    }

    // ---- reads ----

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn pages(&self) -> &[Page] {
        &self.outline.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.outline.pages.iter().find(|p| p.index == index)
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn images(&self) -> &[GeneratedImage] {
        &self.images
    }

    pub fn image(&self, index: usize) -> Option<&GeneratedImage> {
        self.images.iter().find(|img| img.index == index)
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn content(&self) -> &GeneratedContent {
        &self.content
    }

    pub fn user_images(&self) -> &[ReferenceImage] {
        &self.user_images
    }

    /// Persisted subset of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            stage: self.stage,
            topic: self.topic.clone(),
            outline: self.outline.clone(),
            progress: self.progress,
            images: self.images.clone(),
            task_id: self.task_id.clone(),
            record_id: self.record_id.clone(),
            content: self.content.clone(),
        }
    }

    // ---- derived queries ----

    pub fn has_failed_images(&self) -> bool {
        self.images.iter().any(|img| img.status == ImageStatus::Error)
    }

    pub fn failed_count(&self) -> usize {
        self.count_with_status(ImageStatus::Error)
    }

    pub fn completed_count(&self) -> usize {
        self.count_with_status(ImageStatus::Done)
    }

    pub fn is_generating(&self) -> bool {
        self.progress.status == ProgressStatus::Generating
    }

    /// Completion percentage in `[0, 100]`; 0 when there is nothing to generate.
    pub fn progress_percent(&self) -> f64 {
        if self.progress.total == 0 {
            return 0.0;
        }
        let percent = self.progress.current as f64 / self.progress.total as f64 * 100.0;
        percent.clamp(0.0, 100.0)
    }

    /// Pages whose image failed, in ascending index order.
    pub fn failed_pages(&self) -> Vec<Page> {
        let mut pages: Vec<Page> = self
            .outline
            .pages
            .iter()
            .filter(|page| {
                self.image(page.index)
                    .is_some_and(|img| img.status == ImageStatus::Error)
            })
            .cloned()
            .collect();
        pages.sort_by_key(|page| page.index);
        pages
    }

    fn count_with_status(&self, status: ImageStatus) -> usize {
        self.images.iter().filter(|img| img.status == status).count()
    }

    // ---- outline mutations ----

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
        self.persist();
    }

    /// Reference images for the next outline or generation request. Kept in
    /// memory only.
    pub fn set_user_images(&mut self, images: Vec<ReferenceImage>) {
        self.user_images = images;
        self.persist();
    }

    /// Install a freshly generated outline and move to the outline stage.
    pub fn set_outline(&mut self, raw: impl Into<String>, pages: Vec<Page>) {
        self.outline.raw = raw.into();
        self.outline.pages = reindex(pages);
        self.stage = Stage::Outline;
        self.persist();
    }

    pub fn update_page(&mut self, index: usize, content: impl Into<String>) -> Result<(), ApiError> {
        let page = self
            .outline
            .pages
            .iter_mut()
            .find(|p| p.index == index)
            .ok_or(ApiError::PageNotFound(index))?;
        page.content = content.into();
        self.sync_raw_from_pages();
        self.persist();
        Ok(())
    }

    pub fn delete_page(&mut self, index: usize) -> Result<(), ApiError> {
        self.ensure_structure_editable()?;
        if self.page(index).is_none() {
            return Err(ApiError::PageNotFound(index));
        }
        let pages = std::mem::take(&mut self.outline.pages)
            .into_iter()
            .filter(|p| p.index != index)
            .collect();
        self.outline.pages = reindex(pages);
        self.sync_raw_from_pages();
        self.persist();
        Ok(())
    }

    /// Append a page and return its index.
    pub fn add_page(&mut self, page_type: PageType, content: impl Into<String>) -> Result<usize, ApiError> {
        self.ensure_structure_editable()?;
        let index = self.outline.pages.len();
        self.outline.pages.push(Page::new(index, page_type, content));
        self.sync_raw_from_pages();
        self.persist();
        Ok(index)
    }

    fn ensure_structure_editable(&self) -> Result<(), ApiError> {
        match self.stage {
            Stage::Generating | Stage::Result => Err(ApiError::InvalidState(format!(
                "pages cannot be added or removed during the {} stage",
                self.stage.as_str()
            ))),
            Stage::Input | Stage::Outline => Ok(()),
        }
    }

    fn sync_raw_from_pages(&mut self) {
        self.outline.raw = join_pages(&self.outline.pages);
    }

    // ---- generation mutations ----

    /// Enter the generating stage with one pending image per page.
    pub fn start_generation(&mut self) {
        self.stage = Stage::Generating;
        self.progress = Progress {
            current: 0,
            total: self.outline.pages.len(),
            status: ProgressStatus::Generating,
        };
        self.images = self
            .outline
            .pages
            .iter()
            .map(|page| GeneratedImage::pending(page.index))
            .collect();
        self.persist();
    }

    /// Apply a per-image status report. Re-reporting `done` for an image that
    /// is already done does not advance the counter again.
    pub fn update_progress(
        &mut self,
        index: usize,
        status: ImageStatus,
        url: Option<&str>,
        error: Option<&str>,
    ) {
        let Some(image) = self.images.iter_mut().find(|img| img.index == index) else {
            warn!(index, status = status.as_str(), "Progress for unknown image index");
            return;
        };
        let was_done = image.status == ImageStatus::Done;
        if was_done && !status.is_terminal() {
            debug!(index, status = status.as_str(), "Ignoring late progress for finished image");
            return;
        }

        if let Some(url) = url.filter(|u| !u.is_empty()) {
            image.url = url.to_string();
        }
        if status == ImageStatus::Done && image.url.is_empty() {
            warn!(index, "Image reported done without a url");
            image.status = ImageStatus::Error;
            image.error = Some(MISSING_URL_ERROR.to_string());
        } else {
            image.status = status;
            if status == ImageStatus::Done {
                image.error = None;
            } else if let Some(error) = error {
                image.error = Some(error.to_string());
            }
        }

        let now_done = image.status == ImageStatus::Done;
        if now_done && !was_done {
            self.advance_progress();
        } else if was_done && !now_done {
            self.retract_progress();
        }
        self.persist();
    }

    /// Mark an image as being regenerated. A done image leaves the completed
    /// count until the retry lands.
    pub fn set_image_retrying(&mut self, index: usize) -> Result<(), ApiError> {
        let image = self.image_mut(index)?;
        let was_done = image.status == ImageStatus::Done;
        image.status = ImageStatus::Retrying;
        if was_done {
            self.retract_progress();
        }
        self.persist();
        Ok(())
    }

    /// Record a successful regeneration. The stored URL carries a fresh
    /// cache-busting token so a previously fetched image is not reused.
    pub fn update_image(&mut self, index: usize, new_url: &str) -> Result<String, ApiError> {
        let token = self.next_cache_token();
        let image = self.image_mut(index)?;
        let was_done = image.status == ImageStatus::Done;
        image.url = cache_busted(new_url, token);
        image.status = ImageStatus::Done;
        image.error = None;
        let url = image.url.clone();
        if !was_done {
            self.advance_progress();
        }
        self.persist();
        Ok(url)
    }

    /// Revert an image to `error` with a new message.
    pub fn set_image_error(&mut self, index: usize, message: impl Into<String>) -> Result<(), ApiError> {
        let image = self.image_mut(index)?;
        let was_done = image.status == ImageStatus::Done;
        image.status = ImageStatus::Error;
        image.error = Some(message.into());
        if was_done {
            self.retract_progress();
        }
        self.persist();
        Ok(())
    }

    pub fn finish_generation(&mut self, task_id: impl Into<String>) {
        self.task_id = Some(task_id.into());
        self.stage = Stage::Result;
        self.progress.status = ProgressStatus::Done;
        self.persist();
    }

    /// Mark the run as failed at the stream level. Per-image entries are left
    /// as last observed.
    pub fn mark_stream_failed(&mut self) {
        self.progress.status = ProgressStatus::Error;
        self.persist();
    }

    fn image_mut(&mut self, index: usize) -> Result<&mut GeneratedImage, ApiError> {
        self.images
            .iter_mut()
            .find(|img| img.index == index)
            .ok_or(ApiError::PageNotFound(index))
    }

    fn advance_progress(&mut self) {
        if self.progress.current < self.progress.total {
            self.progress.current += 1;
        }
    }

    fn retract_progress(&mut self) {
        self.progress.current = self.progress.current.saturating_sub(1);
    }

    fn next_cache_token(&mut self) -> u64 {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
        self.last_cache_token = now.max(self.last_cache_token + 1);
        self.last_cache_token
    }

    // ---- content mutations ----

    pub fn start_content_generation(&mut self) {
        self.content.status = ContentStatus::Generating;
        self.content.error = None;
        self.persist();
    }

    pub fn set_content(&mut self, titles: Vec<String>, copywriting: impl Into<String>, tags: Vec<String>) {
        self.content = GeneratedContent {
            titles,
            copywriting: copywriting.into(),
            tags,
            status: ContentStatus::Done,
            error: None,
        };
        self.persist();
    }

    pub fn set_content_error(&mut self, error: impl Into<String>) {
        self.content.status = ContentStatus::Error;
        self.content.error = Some(error.into());
        self.persist();
    }

    // ---- task identity ----

    pub fn set_record_id(&mut self, record_id: Option<String>) {
        self.record_id = record_id;
        self.persist();
    }

    /// Replace the active task with a finished task loaded from history.
    pub fn load_record(
        &mut self,
        topic: impl Into<String>,
        outline: Outline,
        task_id: Option<String>,
        record_id: impl Into<String>,
        images: Vec<GeneratedImage>,
    ) {
        let pages = reindex(outline.pages);
        let done = images
            .iter()
            .filter(|img| img.status == ImageStatus::Done)
            .count();
        self.stage = Stage::Result;
        self.topic = topic.into();
        self.outline = Outline {
            raw: outline.raw,
            pages,
        };
        self.progress = Progress {
            current: done,
            total: self.outline.pages.len(),
            status: ProgressStatus::Done,
        };
        self.images = images;
        self.task_id = task_id;
        self.record_id = Some(record_id.into());
        self.content = GeneratedContent::default();
        self.user_images.clear();
        self.persist();
    }

    /// Discard the active task and delete the persisted snapshot.
    pub fn reset(&mut self) {
        let storage = Arc::clone(&self.storage);
        *self = Self::from_snapshot(Snapshot::default(), storage);
        if let Err(e) = self.storage.remove() {
            warn!(error = %e, "Failed to remove generator state");
        }
    }

    fn persist(&self) {
        let bytes = match self.snapshot().to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to serialize generator state");
                return;
            }
        };
        if let Err(e) = self.storage.write(&bytes) {
            warn!(error = %e, "Failed to save generator state");
        }
    }
}

fn release_interrupted_retries(images: &mut [GeneratedImage]) -> usize {
    let mut count = 0;
    for image in images
        .iter_mut()
        .filter(|img| img.status == ImageStatus::Retrying)
    {
        image.status = ImageStatus::Error;
        image.error = Some(INTERRUPTED_RETRY_ERROR.to_string());
        count += 1;
    }
    count
}

/// Append a `t=<token>` query parameter to `url`.
pub fn cache_busted(url: &str, token: u64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}t={token}")
}

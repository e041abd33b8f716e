//! Applying decoded stream events to the state store.

use tracing::{debug, info, warn};

use crate::store::GenerationStateStore;
use crate::stream::{FinishEvent, ItemEvent, StreamEvent};
use crate::types::ImageStatus;

/// Message recorded when the service reports a failure without saying why.
pub const UNSPECIFIED_FAILURE: &str = "generation failed";

/// Apply one event. Events are applied in arrival order; unknown indices and
/// phase announcements are skipped.
pub fn apply_event(store: &mut GenerationStateStore, event: &StreamEvent) {
    match event {
        StreamEvent::Progress(item) | StreamEvent::Complete(item) => apply_item(store, item),
        StreamEvent::Error(item) => apply_error(store, item),
        StreamEvent::Finish(finish) => apply_finish(store, finish),
    }
}

fn apply_item(store: &mut GenerationStateStore, item: &ItemEvent) {
    let Some(status) = item.status.image_status() else {
        debug!(phase = ?item.phase, "Generation phase started");
        return;
    };
    let Some(index) = item.index else {
        debug!(status = status.as_str(), "Ignoring item event without index");
        return;
    };
    let error = match status {
        ImageStatus::Error => Some(item.message.as_deref().unwrap_or(UNSPECIFIED_FAILURE)),
        _ => None,
    };
    store.update_progress(index, status, item.image_url.as_deref(), error);
}

fn apply_error(store: &mut GenerationStateStore, item: &ItemEvent) {
    let message = item.message.as_deref().unwrap_or(UNSPECIFIED_FAILURE);
    let Some(index) = item.index else {
        warn!(error = message, "Service reported an error without an index");
        return;
    };
    warn!(index, error = message, "Image generation failed");
    store.update_progress(index, ImageStatus::Error, None, Some(message));
}

fn apply_finish(store: &mut GenerationStateStore, finish: &FinishEvent) {
    for &index in &finish.failed_indices {
        let needs_marking = store
            .image(index)
            .is_some_and(|img| !matches!(img.status, ImageStatus::Error | ImageStatus::Done));
        if needs_marking {
            store.update_progress(index, ImageStatus::Error, None, Some(UNSPECIFIED_FAILURE));
        }
    }
    info!(
        task_id = %finish.task_id,
        completed = finish.completed,
        failed = finish.failed,
        total = finish.total,
        "Generation finished"
    );
    store.finish_generation(finish.task_id.clone());
}

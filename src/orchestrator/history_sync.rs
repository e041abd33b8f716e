//! Writes task state to the history record at stage boundaries.

use tracing::{debug, warn};

use super::GenerationOrchestrator;
use crate::history::{status, HistoryImages, HistoryUpdate};
use crate::store::GenerationStateStore;
use crate::types::{ImageStatus, Stage};

/// Update describing the store's current task.
pub fn history_update(store: &GenerationStateStore) -> HistoryUpdate {
    let generated: Vec<String> = store
        .images()
        .iter()
        .filter(|img| img.status == ImageStatus::Done)
        .filter_map(|img| img.filename().map(str::to_string))
        .collect();

    let record_status = match store.stage() {
        Stage::Result if store.has_failed_images() => status::PARTIAL,
        Stage::Result => status::COMPLETED,
        Stage::Generating => status::GENERATING,
        Stage::Input | Stage::Outline => status::DRAFT,
    };

    HistoryUpdate {
        outline: Some(store.outline().clone()),
        thumbnail: generated.first().cloned(),
        images: store.task_id().map(|task_id| HistoryImages {
            task_id: Some(task_id.to_string()),
            generated,
        }),
        status: Some(record_status.to_string()),
    }
}

impl GenerationOrchestrator {
    /// Create the history record for a fresh outline. Failures are logged and
    /// leave the task without a record.
    pub(crate) async fn create_history_record(&self, store: &mut GenerationStateStore) {
        let Some(history) = &self.history else {
            return;
        };
        let created = history
            .create(store.topic(), store.outline(), store.task_id())
            .await;
        match created {
            Ok(record_id) => {
                debug!(record_id = %record_id, "Draft history record created");
                store.set_record_id(Some(record_id));
            }
            Err(e) => warn!(error = %e, "Failed to create history record"),
        }
    }

    /// Push the task's current state to its history record, if it has one.
    pub(crate) async fn sync_history(&self, store: &GenerationStateStore) {
        let (Some(history), Some(record_id)) = (&self.history, store.record_id()) else {
            return;
        };
        let update = history_update(store);
        if let Err(e) = history.update(record_id, &update).await {
            warn!(record_id, error = %e, "Failed to update history record");
        }
    }
}

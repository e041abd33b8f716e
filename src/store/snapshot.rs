//! Persisted subset of the active task.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::types::{GeneratedContent, GeneratedImage, Outline, Progress, Stage};

/// Exactly the fields written to durable storage. Every field has a default so
/// partially written snapshots still load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub stage: Stage,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub outline: Outline,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub content: GeneratedContent,
}

impl Snapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec(self).map_err(|e| StorageError::WriteFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        serde_json::from_slice(bytes).map_err(|e| StorageError::Malformed(e.to_string()))
    }
}

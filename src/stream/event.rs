//! Closed event union for the generation stream.
//!
//! Payloads are validated at the decoder boundary; anything that does not fit one
//! of the four variants never reaches the orchestrator.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::types::ImageStatus;

/// Event type named on the first line of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Progress,
    Complete,
    Error,
    Finish,
}

impl EventKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "progress" => Some(EventKind::Progress),
            "complete" => Some(EventKind::Complete),
            "error" => Some(EventKind::Error),
            "finish" => Some(EventKind::Finish),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Progress => "progress",
            EventKind::Complete => "complete",
            EventKind::Error => "error",
            EventKind::Finish => "finish",
        }
    }
}

/// Item status as reported by the service. `batch_start` announces a phase and
/// carries no index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Generating,
    Done,
    Error,
    Retrying,
    BatchStart,
}

impl ItemStatus {
    /// Image status this item status maps to, if it concerns a single image.
    pub fn image_status(self) -> Option<ImageStatus> {
        match self {
            ItemStatus::Generating => Some(ImageStatus::Generating),
            ItemStatus::Done => Some(ImageStatus::Done),
            ItemStatus::Error => Some(ImageStatus::Error),
            ItemStatus::Retrying => Some(ImageStatus::Retrying),
            ItemStatus::BatchStart => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Cover,
    Content,
}

/// Payload shared by `progress`, `complete` and `error` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEvent {
    #[serde(default)]
    pub index: Option<usize>,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

/// Authoritative end-of-run payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishEvent {
    pub success: bool,
    pub task_id: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    #[serde(default)]
    pub failed_indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Progress(ItemEvent),
    Complete(ItemEvent),
    Error(ItemEvent),
    Finish(FinishEvent),
}

impl StreamEvent {
    /// Build a typed event from a record's event name and JSON data.
    pub fn from_record(event_type: &str, data: &str) -> Result<Self, DecodeError> {
        let kind = EventKind::parse(event_type)
            .ok_or_else(|| DecodeError::UnknownEvent(event_type.to_string()))?;
        let invalid = |e: serde_json::Error| DecodeError::InvalidPayload {
            event_type: kind.as_str().to_string(),
            message: e.to_string(),
        };
        let event = match kind {
            EventKind::Progress => StreamEvent::Progress(serde_json::from_str(data).map_err(invalid)?),
            EventKind::Complete => StreamEvent::Complete(serde_json::from_str(data).map_err(invalid)?),
            EventKind::Error => StreamEvent::Error(serde_json::from_str(data).map_err(invalid)?),
            EventKind::Finish => StreamEvent::Finish(serde_json::from_str(data).map_err(invalid)?),
        };
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            StreamEvent::Progress(_) => EventKind::Progress,
            StreamEvent::Complete(_) => EventKind::Complete,
            StreamEvent::Error(_) => EventKind::Error,
            StreamEvent::Finish(_) => EventKind::Finish,
        }
    }

    /// Page index the event concerns, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            StreamEvent::Progress(item) | StreamEvent::Complete(item) | StreamEvent::Error(item) => {
                item.index
            }
            StreamEvent::Finish(_) => None,
        }
    }
}

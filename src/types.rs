//! Data model for a generation task: stage, outline pages, per-page images,
//! aggregate progress and generated post content.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Coarse pipeline phase of the active task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Input,
    Outline,
    Generating,
    Result,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Outline => "outline",
            Stage::Generating => "generating",
            Stage::Result => "result",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Cover,
    #[default]
    Content,
    Summary,
}

impl PageType {
    pub fn as_str(self) -> &'static str {
        match self {
            PageType::Cover => "cover",
            PageType::Content => "content",
            PageType::Summary => "summary",
        }
    }

    /// Map an outline tag (`[cover]`, `[封面]`, ...) to a page type.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "cover" | "封面" => Some(PageType::Cover),
            "content" | "内容" => Some(PageType::Content),
            "summary" | "总结" => Some(PageType::Summary),
            _ => None,
        }
    }
}

impl std::str::FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageType::from_tag(s).ok_or_else(|| {
            format!("Invalid page type: {} (must be 'cover', 'content' or 'summary')", s)
        })
    }
}

/// One outline unit; produces exactly one generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub content: String,
}

impl Page {
    pub fn new(index: usize, page_type: PageType, content: impl Into<String>) -> Self {
        Self {
            index,
            page_type,
            content: content.into(),
        }
    }
}

/// Outline in both representations: the concatenated raw text and the page list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Outline {
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Generating,
    Done,
    Error,
    Retrying,
}

impl ImageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageStatus::Generating => "generating",
            ImageStatus::Done => "done",
            ImageStatus::Error => "error",
            ImageStatus::Retrying => "retrying",
        }
    }

    /// `done` and `error` end an image's run; the other states are transient.
    pub fn is_terminal(self) -> bool {
        matches!(self, ImageStatus::Done | ImageStatus::Error)
    }
}

/// Generated image for the page with the same index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub index: usize,
    /// Empty until produced.
    #[serde(default)]
    pub url: String,
    pub status: ImageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GeneratedImage {
    pub fn pending(index: usize) -> Self {
        Self {
            index,
            url: String::new(),
            status: ImageStatus::Generating,
            error: None,
        }
    }

    /// File name of the produced image, taken from the last URL path segment.
    pub fn filename(&self) -> Option<&str> {
        if self.url.is_empty() {
            return None;
        }
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    #[default]
    Idle,
    Generating,
    Done,
    Error,
}

impl ProgressStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::Idle => "idle",
            ProgressStatus::Generating => "generating",
            ProgressStatus::Done => "done",
            ProgressStatus::Error => "error",
        }
    }
}

/// Aggregate run counters. `current` only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub status: ProgressStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    #[default]
    Idle,
    Generating,
    Done,
    Error,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Idle => "idle",
            ContentStatus::Generating => "generating",
            ContentStatus::Done => "done",
            ContentStatus::Error => "error",
        }
    }
}

/// Titles, copy and tags generated once the outline is final.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneratedContent {
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub copywriting: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ContentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// User-supplied reference image. Held in memory only, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ReferenceImage {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Read an image file, guessing the MIME type from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime = match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "image/png",
        };
        Ok(Self::new(mime, bytes))
    }

    /// Self-contained `data:` URL so requests can be replayed without file access.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

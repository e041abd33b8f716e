//! Active task formatters: outline, status, run events, retries and content.

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

use super::shared::{format_section_heading, truncate_line};
use crate::error::ApiError;
use crate::orchestrator::{RetrySummary, RunOutcome};
use crate::service::GenerationService;
use crate::store::GenerationStateStore;
use crate::stream::StreamEvent;
use crate::types::{ContentStatus, GeneratedContent, ImageStatus};

const CONTENT_WIDTH: usize = 48;

pub fn format_outline_text(store: &GenerationStateStore) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Outline")));
    if !store.topic().is_empty() {
        out.push_str(&format!("  Topic: {}\n", store.topic()));
    }
    if store.pages().is_empty() {
        out.push_str("  No outline yet. Run `notegen topic <text>` to create one.\n");
        return out;
    }
    out.push_str(&format!("  Pages: {}\n\n", store.pages().len()));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Type", "Content"]);
    for page in store.pages() {
        table.add_row(vec![
            page.index.to_string(),
            page.page_type.as_str().to_string(),
            truncate_line(&page.content, CONTENT_WIDTH),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_outline_json(store: &GenerationStateStore) -> Result<String, ApiError> {
    let value = json!({
        "topic": store.topic(),
        "stage": store.stage().as_str(),
        "outline": store.outline(),
    });
    serde_json::to_string_pretty(&value)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode outline: {}", e)))
}

pub fn format_status_text(store: &GenerationStateStore, service: &dyn GenerationService) -> String {
    let progress = store.progress();
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Task")));
    out.push_str(&format!("  Stage: {}\n", store.stage().as_str()));
    if !store.topic().is_empty() {
        out.push_str(&format!("  Topic: {}\n", store.topic()));
    }
    out.push_str(&format!(
        "  Task id: {}\n",
        store.task_id().unwrap_or("-")
    ));
    out.push_str(&format!(
        "  Record id: {}\n",
        store.record_id().unwrap_or("-")
    ));
    out.push_str(&format!(
        "  Progress: {}/{} ({:.0}%, {})\n",
        progress.current,
        progress.total,
        store.progress_percent(),
        progress.status.as_str()
    ));
    if store.has_failed_images() {
        out.push_str(&format!(
            "  {}\n",
            format!(
                "{} failed. Run `notegen retry-failed` to regenerate them.",
                store.failed_count()
            )
            .red()
        ));
    }

    if !store.images().is_empty() {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Images")));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["#", "Type", "Status", "Image"]);
        for image in store.images() {
            let page_type = store
                .page(image.index)
                .map(|p| p.page_type.as_str())
                .unwrap_or("-");
            let detail = match (image.status, &image.error) {
                (ImageStatus::Error, Some(error)) => error.clone(),
                _ if image.url.is_empty() => "-".to_string(),
                _ => service.resolve_url(&image.url),
            };
            table.add_row(vec![
                image.index.to_string(),
                page_type.to_string(),
                image.status.as_str().to_string(),
                detail,
            ]);
        }
        out.push_str(&format!("{}\n", table));
    }

    if store.content().status != ContentStatus::Idle {
        out.push('\n');
        out.push_str(&format_content_text(store.content()));
    }
    out
}

pub fn format_status_json(store: &GenerationStateStore) -> Result<String, ApiError> {
    let value = json!({
        "state": store.snapshot(),
        "progress_percent": store.progress_percent(),
        "completed": store.completed_count(),
        "failed": store.failed_count(),
        "is_generating": store.is_generating(),
        "failed_indices": store.failed_pages().iter().map(|p| p.index).collect::<Vec<_>>(),
    });
    serde_json::to_string_pretty(&value)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode status: {}", e)))
}

/// One line per applied stream event.
pub fn format_event_line(event: &StreamEvent, store: &GenerationStateStore) -> Option<String> {
    let progress = store.progress();
    let counter = format!("[{}/{}]", progress.current, progress.total);
    match event {
        StreamEvent::Progress(item) | StreamEvent::Complete(item) => {
            let index = item.index?;
            let status = store.image(index)?.status;
            Some(format!("{} page {} {}", counter, index, status.as_str()))
        }
        StreamEvent::Error(item) => Some(format!(
            "{} page {} {}: {}",
            counter,
            item.index.map(|i| i.to_string()).unwrap_or_else(|| "?".to_string()),
            "failed".red(),
            item.message.as_deref().unwrap_or("unknown error")
        )),
        StreamEvent::Finish(finish) => Some(format!(
            "{} finished task {}: {} completed, {} failed",
            counter, finish.task_id, finish.completed, finish.failed
        )),
    }
}

pub fn format_run_outcome(outcome: &RunOutcome, store: &GenerationStateStore) -> String {
    match outcome {
        RunOutcome::Finished(finish) if finish.failed == 0 => format!(
            "{} All {} pages generated (task {}).",
            "Done.".green(),
            finish.total,
            finish.task_id
        ),
        RunOutcome::Finished(finish) => format!(
            "{} {} of {} pages generated, {} failed (pages {}).\nRun `notegen retry-failed` to regenerate them.",
            "Finished with failures.".yellow(),
            finish.completed,
            finish.total,
            finish.failed,
            join_indices(store.failed_pages().iter().map(|p| p.index))
        ),
        RunOutcome::Stalled {
            completed,
            failed,
            pending,
        } => format!(
            "{} The stream closed before the run finished: {} completed, {} failed, {} pending.\nRun `notegen generate` again or retry pages individually.",
            "Stalled.".yellow(),
            completed,
            failed,
            pending
        ),
        RunOutcome::StreamFailed(error) => format!(
            "{} {}\nRun `notegen generate` to start over.",
            "Stream failed.".red(),
            error
        ),
    }
}

pub fn format_retry_summary(summary: &RetrySummary) -> String {
    if summary.attempted() == 0 {
        return "No failed pages to retry.".to_string();
    }
    let mut out = format!(
        "Retried {} pages: {} succeeded, {} failed.\n",
        summary.attempted(),
        summary.succeeded.len(),
        summary.failed.len()
    );
    for (index, error) in &summary.failed {
        out.push_str(&format!("  page {}: {}\n", index, error));
    }
    out
}

pub fn format_content_text(content: &GeneratedContent) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Content")));
    match content.status {
        ContentStatus::Idle => out.push_str("  Not generated yet.\n"),
        ContentStatus::Generating => out.push_str("  Generating...\n"),
        ContentStatus::Error => out.push_str(&format!(
            "  Failed: {}\n",
            content.error.as_deref().unwrap_or("unknown error")
        )),
        ContentStatus::Done => {
            out.push_str("  Titles:\n");
            for title in &content.titles {
                out.push_str(&format!("    - {}\n", title));
            }
            out.push_str(&format!("\n{}\n", content.copywriting));
            if !content.tags.is_empty() {
                let tags: Vec<String> = content.tags.iter().map(|t| format!("#{}", t)).collect();
                out.push_str(&format!("\n  {}\n", tags.join(" ")));
            }
        }
    }
    out
}

fn join_indices(indices: impl Iterator<Item = usize>) -> String {
    indices.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySnapshotStorage;
    use crate::types::{Page, PageType};
    use std::sync::Arc;

    fn store() -> GenerationStateStore {
        let mut store = GenerationStateStore::open(Arc::new(MemorySnapshotStorage::new()));
        store.set_topic("tea");
        store.set_outline(
            "",
            vec![
                Page::new(0, PageType::Cover, "Tea basics"),
                Page::new(1, PageType::Content, "Water temperature"),
            ],
        );
        store
    }

    #[test]
    fn outline_text_lists_pages() {
        let out = format_outline_text(&store());
        assert!(out.contains("Topic: tea"));
        assert!(out.contains("Pages: 2"));
        assert!(out.contains("Water temperature"));
    }

    #[test]
    fn status_json_carries_derived_fields() {
        let mut store = store();
        store.start_generation();
        store.update_progress(1, ImageStatus::Error, None, Some("blocked"));

        let out = format_status_json(&store).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["failed"], 1);
        assert_eq!(value["failed_indices"], json!([1]));
        assert_eq!(value["state"]["stage"], "generating");
        assert_eq!(value["is_generating"], true);
    }

    #[test]
    fn retry_summary_lists_failures() {
        let summary = RetrySummary {
            succeeded: vec![0],
            failed: vec![(2, "timeout".to_string())],
        };
        let out = format_retry_summary(&summary);
        assert!(out.starts_with("Retried 2 pages: 1 succeeded, 1 failed."));
        assert!(out.contains("page 2: timeout"));
        assert_eq!(format_retry_summary(&RetrySummary::default()), "No failed pages to retry.");
    }
}

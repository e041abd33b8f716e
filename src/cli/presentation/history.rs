//! History list formatters.

use chrono::{DateTime, NaiveDateTime};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

use super::shared::{format_section_heading, truncate_line};
use crate::error::ApiError;
use crate::history::HistoryPage;

const TITLE_WIDTH: usize = 32;

/// Render a service timestamp as `YYYY-MM-DD HH:MM`. Unparseable values are
/// shown as-is.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%Y-%m-%d %H:%M").to_string();
    }
    raw.to_string()
}

pub fn format_history_list_text(page: &HistoryPage) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("History")));
    if page.records.is_empty() {
        out.push_str("  No history records.\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Id", "Title", "Status", "Pages", "Updated"]);
    for record in &page.records {
        table.add_row(vec![
            record.id.clone(),
            truncate_line(&record.title, TITLE_WIDTH),
            record.status.clone(),
            record.page_count.to_string(),
            format_timestamp(&record.updated_at),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out.push_str(&format!(
        "\n  Page {} of {} ({} records)\n",
        page.page,
        page.total_pages.max(1),
        page.total
    ));
    out
}

pub fn format_history_list_json(page: &HistoryPage) -> Result<String, ApiError> {
    serde_json::to_string_pretty(page)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode history: {}", e)))
}

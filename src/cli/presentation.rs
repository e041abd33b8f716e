//! CLI presentation: text and json formatters per command family.

mod history;
mod shared;
mod task;

pub use history::{format_history_list_json, format_history_list_text, format_timestamp};
pub use shared::format_section_heading;
pub use task::{
    format_content_text, format_event_line, format_outline_json, format_outline_text,
    format_retry_summary, format_run_outcome, format_status_json, format_status_text,
};

//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the orchestrator
//! and the state store.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands, HistoryCommands, PageCommands};
pub use presentation::{
    format_content_text, format_event_line, format_history_list_json, format_history_list_text,
    format_outline_json, format_outline_text, format_retry_summary, format_run_outcome,
    format_section_heading, format_status_json, format_status_text, format_timestamp,
};
pub use route::RunContext;

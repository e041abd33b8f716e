//! CLI parse: clap types for notegen. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::PageType;

/// notegen CLI - outline and page image generation with per-page retries
#[derive(Parser)]
#[command(name = "notegen")]
#[command(about = "Turn a topic into an outline and one generated image per page")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new task: generate an outline for a topic
    Topic {
        /// Topic text
        text: String,
        /// Reference image to send along (repeatable)
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },
    /// Show the outline, or load one from a local file
    Outline {
        /// Outline file with pages separated by <page> or ---
        #[arg(long)]
        from_file: Option<PathBuf>,
        /// Topic to record with a loaded outline
        #[arg(long)]
        topic: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Edit outline pages
    Page {
        #[command(subcommand)]
        command: PageCommands,
    },
    /// Generate every page image over one streamed request
    Generate,
    /// Regenerate a single page image
    Retry {
        /// Page index
        index: usize,
        /// Do not use the cover image as style reference
        #[arg(long)]
        no_reference: bool,
    },
    /// Regenerate every failed page image
    RetryFailed {
        /// Do not use the cover image as style reference
        #[arg(long)]
        no_reference: bool,
    },
    /// Generate titles, copy and tags for the outline
    Content,
    /// Show the active task
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Discard the active task
    Reset {
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Browse and load history records
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum PageCommands {
    /// Replace the content of a page
    Edit {
        /// Page index
        index: usize,
        /// New page content
        text: String,
    },
    /// Append a page
    Add {
        /// Page type (cover, content, summary)
        page_type: PageType,
        /// Page content
        text: Option<String>,
    },
    /// Delete a page and renumber the rest
    Delete {
        /// Page index
        index: usize,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List history records
    List {
        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: usize,
        /// Records per page
        #[arg(long, default_value = "20")]
        page_size: usize,
        /// Filter by status (draft, completed, partial)
        #[arg(long)]
        status: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Replace the active task with a history record
    Load {
        /// Record id
        id: String,
    },
    /// Delete a history record
    Delete {
        /// Record id
        id: String,
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Validate the effective configuration
    Validate,
}

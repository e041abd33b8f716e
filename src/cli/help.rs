//! CLI command-name contract for logging and routing.

use crate::cli::parse::{Commands, ConfigCommands, HistoryCommands, PageCommands};

/// Command name string for log records (e.g. "page.edit", "history.list").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Topic { .. } => "topic".to_string(),
        Commands::Outline { .. } => "outline".to_string(),
        Commands::Page { command } => format!("page.{}", page_command_name(command)),
        Commands::Generate => "generate".to_string(),
        Commands::Retry { .. } => "retry".to_string(),
        Commands::RetryFailed { .. } => "retry_failed".to_string(),
        Commands::Content => "content".to_string(),
        Commands::Status { .. } => "status".to_string(),
        Commands::Reset { .. } => "reset".to_string(),
        Commands::History { command } => format!("history.{}", history_command_name(command)),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

pub fn page_command_name(command: &PageCommands) -> &'static str {
    match command {
        PageCommands::Edit { .. } => "edit",
        PageCommands::Add { .. } => "add",
        PageCommands::Delete { .. } => "delete",
    }
}

pub fn history_command_name(command: &HistoryCommands) -> &'static str {
    match command {
        HistoryCommands::List { .. } => "list",
        HistoryCommands::Load { .. } => "load",
        HistoryCommands::Delete { .. } => "delete",
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show => "show",
        ConfigCommands::Validate => "validate",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse::Cli;
    use clap::Parser;

    #[test]
    fn nested_commands_are_dotted() {
        let cli = Cli::try_parse_from(["notegen", "page", "delete", "2"]).unwrap();
        assert_eq!(command_name(&cli.command), "page.delete");
        let cli = Cli::try_parse_from(["notegen", "history", "list", "--page", "2"]).unwrap();
        assert_eq!(command_name(&cli.command), "history.list");
    }

    #[test]
    fn page_add_parses_page_type() {
        let cli = Cli::try_parse_from(["notegen", "page", "add", "summary", "wrap up"]).unwrap();
        match cli.command {
            Commands::Page {
                command: PageCommands::Add { page_type, text },
            } => {
                assert_eq!(page_type, crate::types::PageType::Summary);
                assert_eq!(text.as_deref(), Some("wrap up"));
            }
            _ => panic!("expected page add"),
        }
        assert!(Cli::try_parse_from(["notegen", "page", "add", "poster"]).is_err());
    }
}

//! CLI route: single route table and run context. Dispatches to the
//! orchestrator, the state store and presentation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::cli::command_name;
use crate::cli::parse::{Commands, ConfigCommands, HistoryCommands, PageCommands};
use crate::cli::presentation::{
    format_content_text, format_event_line, format_history_list_json, format_history_list_text,
    format_outline_json, format_outline_text, format_retry_summary, format_run_outcome,
    format_status_json, format_status_text,
};
use crate::config::{ConfigLoader, NotegenConfig};
use crate::error::ApiError;
use crate::history::{HistoryRepository, HttpHistoryRepository};
use crate::orchestrator::{GenerationOrchestrator, RunObserver};
use crate::service::{GenerationService, HttpGenerationService};
use crate::store::{GenerationStateStore, SledSnapshotStorage};
use crate::stream::StreamEvent;
use crate::types::{ReferenceImage, Stage};

/// Prints each applied stream event as it arrives.
struct ConsoleObserver;

impl RunObserver for ConsoleObserver {
    fn on_event(&mut self, event: &StreamEvent, store: &GenerationStateStore) {
        if let Some(line) = format_event_line(event, store) {
            println!("{}", line);
        }
    }
}

/// Runtime context for CLI execution: configuration, the persisted active task
/// and the orchestrator wired to the remote service.
pub struct RunContext {
    config: NotegenConfig,
    workspace_root: PathBuf,
    config_path: Option<PathBuf>,
    store: GenerationStateStore,
    orchestrator: GenerationOrchestrator,
    runtime: Runtime,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        if let Err(errors) = config.validate() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(ApiError::ConfigError(messages.join("; ")));
        }

        let state_path = config.storage.resolve_state_path(&workspace_root);
        std::fs::create_dir_all(&state_path)
            .map_err(|e| ApiError::StorageError(crate::error::StorageError::IoError(e)))?;
        let storage = Arc::new(SledSnapshotStorage::new(&state_path)?);
        let store = GenerationStateStore::open(storage);
        debug!(path = %state_path.display(), stage = store.stage().as_str(), "Active task restored");

        let service: Arc<dyn GenerationService> =
            Arc::new(HttpGenerationService::new(config.service.clone())?);
        let history: Arc<dyn HistoryRepository> =
            Arc::new(HttpHistoryRepository::new(config.service.clone())?);
        let orchestrator =
            GenerationOrchestrator::from_config(service, Some(history), &config.service);

        let runtime = Runtime::new()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create async runtime: {}", e)))?;

        Ok(Self {
            config,
            workspace_root,
            config_path,
            store,
            orchestrator,
            runtime,
        })
    }

    /// The persisted active task.
    pub fn store(&self) -> &GenerationStateStore {
        &self.store
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&mut self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(command = %name, "Executing command");
        let result = self.execute_inner(command);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(_) => info!(command = %name, duration_ms, "Command finished"),
            Err(e) => warn!(command = %name, duration_ms, error = %e, "Command failed"),
        }
        result
    }

    fn execute_inner(&mut self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Topic { text, images } => self.handle_topic(text, images),
            Commands::Outline {
                from_file,
                topic,
                format,
            } => self.handle_outline(from_file.as_deref(), topic.as_deref(), format),
            Commands::Page { command } => self.handle_page(command),
            Commands::Generate => self.handle_generate(),
            Commands::Retry {
                index,
                no_reference,
            } => self.handle_retry(*index, *no_reference),
            Commands::RetryFailed { no_reference } => self.handle_retry_failed(*no_reference),
            Commands::Content => self.handle_content(),
            Commands::Status { format } => self.handle_status(format),
            Commands::Reset { yes } => self.handle_reset(*yes),
            Commands::History { command } => self.handle_history(command),
            Commands::Config { command } => self.handle_config(command),
        }
    }

    fn handle_topic(&mut self, text: &str, images: &[PathBuf]) -> Result<String, ApiError> {
        let images = images
            .iter()
            .map(|path| load_reference_image(&self.workspace_root, path))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.set_user_images(images);

        let Self {
            runtime,
            orchestrator,
            store,
            ..
        } = self;
        runtime.block_on(orchestrator.create_outline(store, text))?;
        Ok(format_outline_text(&self.store))
    }

    fn handle_outline(
        &mut self,
        from_file: Option<&Path>,
        topic: Option<&str>,
        format: &str,
    ) -> Result<String, ApiError> {
        if let Some(path) = from_file {
            let path = resolve_input_path(&self.workspace_root, path);
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                ApiError::ConfigError(format!("Failed to read outline {}: {}", path.display(), e))
            })?;
            let topic = topic.map(str::to_string).unwrap_or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let Self {
                runtime,
                orchestrator,
                store,
                ..
            } = self;
            runtime.block_on(orchestrator.import_outline(store, &topic, &raw))?;
        }

        match format {
            "json" => format_outline_json(&self.store),
            "text" => Ok(format_outline_text(&self.store)),
            _ => Err(invalid_format(format)),
        }
    }

    fn handle_page(&mut self, command: &PageCommands) -> Result<String, ApiError> {
        if self.store.pages().is_empty() && !matches!(command, PageCommands::Add { .. }) {
            return Err(ApiError::NoTask("No outline to edit".to_string()));
        }
        let message = match command {
            PageCommands::Edit { index, text } => {
                self.store.update_page(*index, text.as_str())?;
                format!("Page {} updated.", index)
            }
            PageCommands::Add { page_type, text } => {
                let index = self
                    .store
                    .add_page(*page_type, text.clone().unwrap_or_default())?;
                format!("Added {} page {}.", page_type.as_str(), index)
            }
            PageCommands::Delete { index } => {
                self.store.delete_page(*index)?;
                format!("Page {} deleted; pages renumbered.", index)
            }
        };
        self.runtime.block_on(self.orchestrator.save_outline(&self.store));
        Ok(format!("{}\n\n{}", message, format_outline_text(&self.store)))
    }

    fn handle_generate(&mut self) -> Result<String, ApiError> {
        if self.store.pages().is_empty() {
            return Err(ApiError::NoTask("No outline to generate".to_string()));
        }
        let Self {
            runtime,
            orchestrator,
            store,
            ..
        } = self;
        let outcome = runtime.block_on(orchestrator.generate(store, &mut ConsoleObserver))?;
        Ok(format_run_outcome(&outcome, &self.store))
    }

    fn handle_retry(&mut self, index: usize, no_reference: bool) -> Result<String, ApiError> {
        let use_reference = !no_reference && self.orchestrator.use_reference();
        let Self {
            runtime,
            orchestrator,
            store,
            ..
        } = self;
        let url = runtime.block_on(orchestrator.retry_image(store, index, use_reference))?;
        Ok(format!(
            "Page {} regenerated: {}",
            index,
            self.orchestrator.service().resolve_url(&url)
        ))
    }

    fn handle_retry_failed(&mut self, no_reference: bool) -> Result<String, ApiError> {
        let use_reference = !no_reference && self.orchestrator.use_reference();
        let Self {
            runtime,
            orchestrator,
            store,
            ..
        } = self;
        let summary = runtime.block_on(orchestrator.retry_failed(store, use_reference))?;
        Ok(format_retry_summary(&summary))
    }

    fn handle_content(&mut self) -> Result<String, ApiError> {
        let Self {
            runtime,
            orchestrator,
            store,
            ..
        } = self;
        runtime.block_on(orchestrator.generate_content(store))?;
        Ok(format_content_text(self.store.content()))
    }

    fn handle_status(&self, format: &str) -> Result<String, ApiError> {
        match format {
            "json" => format_status_json(&self.store),
            "text" => Ok(format_status_text(
                &self.store,
                self.orchestrator.service(),
            )),
            _ => Err(invalid_format(format)),
        }
    }

    fn handle_reset(&mut self, yes: bool) -> Result<String, ApiError> {
        if self.store.stage() == Stage::Input && self.store.topic().is_empty() {
            return Ok("Nothing to reset.".to_string());
        }
        if !yes {
            let confirmed = confirm(&format!(
                "Discard the active task \"{}\" ({})?",
                self.store.topic(),
                self.store.stage().as_str()
            ))?;
            if !confirmed {
                return Ok("Reset cancelled.".to_string());
            }
        }
        self.store.reset();
        Ok("Active task discarded.".to_string())
    }

    fn handle_history(&mut self, command: &HistoryCommands) -> Result<String, ApiError> {
        match command {
            HistoryCommands::List {
                page,
                page_size,
                status,
                format,
            } => {
                if *page == 0 || *page_size == 0 {
                    return Err(ApiError::ConfigError(
                        "Page and page size must be at least 1".to_string(),
                    ));
                }
                let listing = self.runtime.block_on(self.orchestrator.list_history(
                    *page,
                    *page_size,
                    status.as_deref(),
                ))?;
                match format.as_str() {
                    "json" => format_history_list_json(&listing),
                    "text" => Ok(format_history_list_text(&listing)),
                    _ => Err(invalid_format(format)),
                }
            }
            HistoryCommands::Load { id } => {
                let Self {
                    runtime,
                    orchestrator,
                    store,
                    ..
                } = self;
                runtime.block_on(orchestrator.load_history_record(store, id))?;
                Ok(format_status_text(
                    &self.store,
                    self.orchestrator.service(),
                ))
            }
            HistoryCommands::Delete { id, yes } => {
                if !yes && !confirm(&format!("Delete history record {}?", id))? {
                    return Ok("Deletion cancelled.".to_string());
                }
                let Self {
                    runtime,
                    orchestrator,
                    store,
                    ..
                } = self;
                runtime.block_on(orchestrator.delete_history_record(store, id))?;
                Ok(format!("History record {} deleted.", id))
            }
        }
    }

    fn handle_config(&self, command: &ConfigCommands) -> Result<String, ApiError> {
        match command {
            ConfigCommands::Show => toml::to_string_pretty(&self.config)
                .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e))),
            ConfigCommands::Validate => {
                let source = match &self.config_path {
                    Some(path) => path.display().to_string(),
                    None => ConfigLoader::xdg_config_path()
                        .map(|p| format!("{} and workspace files", p.display()))
                        .unwrap_or_else(|| "workspace files".to_string()),
                };
                Ok(format!("Configuration is valid ({}).", source))
            }
        }
    }
}

fn confirm(prompt: &str) -> Result<bool, ApiError> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| ApiError::ConfigError(format!("Failed to get user input: {}", e)))
}

fn invalid_format(format: &str) -> ApiError {
    ApiError::ConfigError(format!(
        "Invalid format: {} (must be 'text' or 'json')",
        format
    ))
}

fn resolve_input_path(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

fn load_reference_image(workspace_root: &Path, path: &Path) -> Result<ReferenceImage, ApiError> {
    let path = resolve_input_path(workspace_root, path);
    ReferenceImage::from_path(&path).map_err(|e| {
        ApiError::ConfigError(format!("Failed to read image {}: {}", path.display(), e))
    })
}

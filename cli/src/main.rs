//! CLI entrypoint for sciquorum
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use sciquorum_application::{
    PublicationAdapter, SessionStore, TextCompletion, ToolExecutorPort, ToolSelector,
    WorkflowEventLogger, WorkflowOrchestrator,
};
use sciquorum_domain::{
    InvocationMode, Parameters, SearchFilter, SessionId, ToolDescriptor, WorkflowDefinition,
};
use sciquorum_infrastructure::tools::SnapshotCache;
use sciquorum_infrastructure::{
    ConfigLoader, DirectoryPublisher, FileConfig, FileOutputFormat, FileSessionStore,
    HttpCompletionClient, HttpPublisher, JsonlWorkflowLogger, LocalToolExecutor, PublicationKind,
    ToolRegistry, UnavailableCompletion,
};
use sciquorum_presentation::{
    Cli, Command, ConsoleFormatter, InvokeArgs, OutputFormat, ProgressReporter, SessionCommand,
    ToolsCommand,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    config.validate().context("Invalid configuration")?;

    let _log_guard = init_logging(&cli, &config)?;
    if !config.output.color {
        colored::control::set_override(false);
    }

    let format = cli.output.unwrap_or(match config.output.format {
        Some(FileOutputFormat::Json) => OutputFormat::Json,
        _ => OutputFormat::Text,
    });

    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    info!("Starting sciquorum");
    let app = App {
        cli: &cli,
        config: &config,
        format,
    };

    match command {
        Command::Tools(cmd) => app.tools(cmd),
        Command::Select {
            topic,
            max,
            offline,
        } => app.select(topic, *max, *offline).await,
        Command::Invoke(args) => app.invoke(args).await,
        Command::Run { workflow, topic } => app.run(workflow, topic.as_deref()).await,
        Command::Session(cmd) => app.session(cmd).await,
    }
}

/// Initialize logging based on verbosity, `RUST_LOG` and the optional log file.
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(cli: &Cli, config: &FileConfig) -> Result<Option<WorkerGuard>> {
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let log_file = cli.log_file.as_ref().or(config.logging.file.as_ref());
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Parse `key=value`; the value is taken as JSON when it parses, else as a string.
fn parse_param(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("Parameter '{}' is not key=value", raw))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("Parameter '{}' has an empty key", raw);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Borrow catalog entries for serialization
fn descriptors(tools: &[Arc<ToolDescriptor>]) -> Vec<&ToolDescriptor> {
    tools.iter().map(Arc::as_ref).collect()
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            token.cancel();
        }
    });
}

struct App<'a> {
    cli: &'a Cli,
    config: &'a FileConfig,
    format: OutputFormat,
}

impl App<'_> {
    fn emit(&self, text: String, json: String) {
        match self.format {
            OutputFormat::Text => print!("{}", text),
            OutputFormat::Json => println!("{}", json),
        }
    }

    // ==================== Dependency wiring ====================

    fn registry(&self, use_cache: bool) -> Result<Arc<ToolRegistry>> {
        let root = self
            .cli
            .root
            .as_ref()
            .or(self.config.registry.root.as_ref())
            .context("No tool directory: pass --root or set [registry] root")?;

        let mut registry = ToolRegistry::new().with_pattern(&self.config.registry.descriptor_glob);
        let cache_dir = self
            .config
            .registry
            .cache_dir
            .clone()
            .or_else(SnapshotCache::default_dir);
        if use_cache
            && !self.config.registry.no_cache
            && let Some(dir) = cache_dir
        {
            registry = registry.with_cache(SnapshotCache::new(dir));
        }

        let catalog = if use_cache {
            registry.load(root)?
        } else {
            registry.discover(root)?
        };
        for error in registry.discovery_errors() {
            warn!("Skipped descriptor: {}", error);
        }
        info!(tools = catalog.len(), root = %root.display(), "Catalog ready");
        Ok(Arc::new(registry))
    }

    fn executor(&self) -> Arc<LocalToolExecutor> {
        Arc::new(LocalToolExecutor::new().with_max_output_bytes(self.config.executor.max_output_bytes))
    }

    fn completion(&self, offline: bool) -> Arc<dyn TextCompletion> {
        let settings = &self.config.completion;
        match (&settings.endpoint, offline) {
            (Some(endpoint), false) => {
                let mut client =
                    HttpCompletionClient::new(endpoint).api_key_from_env(&settings.api_key_env);
                if let Some(model) = &settings.model {
                    client = client.model(model);
                }
                Arc::new(client)
            }
            _ => Arc::new(UnavailableCompletion),
        }
    }

    fn store(&self) -> Result<Arc<FileSessionStore>> {
        let dir = self
            .config
            .workflow
            .session_dir
            .clone()
            .or_else(FileSessionStore::default_dir)
            .context("No session directory: set [workflow] session_dir")?;
        Ok(Arc::new(FileSessionStore::new(dir)))
    }

    fn publisher(&self) -> Option<Arc<dyn PublicationAdapter>> {
        let target = self.config.publication.target.clone()?;
        match self.config.publication.kind {
            PublicationKind::None => None,
            PublicationKind::Directory => Some(Arc::new(DirectoryPublisher::new(target))),
            PublicationKind::Http => Some(Arc::new(HttpPublisher::new(target))),
        }
    }

    // ==================== Commands ====================

    fn tools(&self, cmd: &ToolsCommand) -> Result<()> {
        match cmd {
            ToolsCommand::Scan { fresh } => {
                let registry = self.registry(!fresh)?;
                let stats = registry.stats();
                let skipped: Vec<String> = registry
                    .discovery_errors()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                self.emit(
                    ConsoleFormatter::format_scan(&stats, &skipped),
                    ConsoleFormatter::format_json(&serde_json::json!({
                        "stats": stats,
                        "skipped": skipped,
                    })),
                );
            }
            ToolsCommand::Search {
                query,
                category,
                mode,
                keyword,
            } => {
                let mut filter = SearchFilter::new();
                if let Some(category) = category {
                    filter = filter.with_category(category);
                }
                if let Some(mode) = mode {
                    let mode: InvocationMode = mode.parse().map_err(|e: String| anyhow!(e))?;
                    filter = filter.with_mode(mode);
                }
                if let Some(keyword) = keyword {
                    filter = filter.with_keyword(keyword);
                }
                let hits = self.registry(true)?.search(query, &filter);
                self.emit(
                    ConsoleFormatter::format_tool_list(&hits),
                    ConsoleFormatter::format_json(&descriptors(&hits)),
                );
            }
            ToolsCommand::Suggest { topic, limit } => {
                let hits = self.registry(true)?.suggest(topic, *limit);
                self.emit(
                    ConsoleFormatter::format_tool_list(&hits),
                    ConsoleFormatter::format_json(&descriptors(&hits)),
                );
            }
            ToolsCommand::Show { name } => {
                let registry = self.registry(true)?;
                let tool = registry
                    .get(name)
                    .with_context(|| format!("Unknown tool: {}", name))?;
                self.emit(
                    ConsoleFormatter::format_tool(&tool),
                    ConsoleFormatter::format_json(tool.as_ref()),
                );
            }
        }
        Ok(())
    }

    async fn select(&self, topic: &str, max: Option<usize>, offline: bool) -> Result<()> {
        let registry = self.registry(true)?;
        let selector = ToolSelector::new(self.completion(offline))
            .with_params(self.config.selector.to_params());
        let catalog = registry.catalog();
        let max = max.unwrap_or(selector.params().max_chosen);

        let decision = selector.select(topic, catalog.all(), max).await?;
        self.emit(
            ConsoleFormatter::format_selection(&decision),
            ConsoleFormatter::format_json(&decision),
        );
        Ok(())
    }

    async fn invoke(&self, args: &InvokeArgs) -> Result<()> {
        let registry = self.registry(true)?;
        let tool = registry
            .get(&args.tool)
            .with_context(|| format!("Unknown tool: {}", args.tool))?;

        let mut params = Parameters::new();
        for raw in &args.params {
            let (key, value) = parse_param(raw)?;
            params.insert(key, value);
        }
        let timeout = args
            .timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.config.executor.default_timeout());

        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(cancel.clone());

        let result = self.executor().invoke(&tool, &params, timeout, &cancel).await;
        self.emit(
            ConsoleFormatter::format_execution(&result),
            ConsoleFormatter::format_json(&result),
        );
        if !result.is_ok() {
            bail!("{} finished with status {}", result.tool_name, result.status());
        }
        Ok(())
    }

    async fn run(&self, workflow: &Path, topic: Option<&str>) -> Result<()> {
        let text = std::fs::read_to_string(workflow)
            .with_context(|| format!("Cannot read workflow {}", workflow.display()))?;
        let mut definition: WorkflowDefinition = toml::from_str(&text)
            .with_context(|| format!("Invalid workflow {}", workflow.display()))?;
        if let Some(topic) = topic {
            definition.topic = topic.to_string();
        }

        let registry = self.registry(true)?;
        let store = self.store()?;
        let selector = ToolSelector::new(self.completion(false))
            .with_params(self.config.selector.to_params());

        let mut orchestrator = WorkflowOrchestrator::new(
            registry,
            self.executor() as Arc<dyn ToolExecutorPort>,
            self.completion(false),
        )
        .with_selector(selector)
        .with_store(store as Arc<dyn SessionStore>)
        .with_params(self.config.workflow.to_params());
        if let Some(publisher) = self.publisher() {
            orchestrator = orchestrator.with_publisher(publisher);
        }

        let session = orchestrator.create_session(definition).await?;
        if let Some(dir) = &self.config.logging.transcript_dir
            && let Some(logger) = JsonlWorkflowLogger::for_session(dir, session.id().as_str())
        {
            info!(path = %logger.path().display(), "Writing session transcript");
            orchestrator = orchestrator.with_logger(Arc::new(logger) as Arc<dyn WorkflowEventLogger>);
        }

        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(cancel.clone());

        let output = if self.cli.quiet || self.format == OutputFormat::Json {
            orchestrator
                .run_session(session, &sciquorum_application::NoWorkflowProgress, cancel)
                .await?
        } else {
            let progress = ProgressReporter::new();
            orchestrator.run_session(session, &progress, cancel).await?
        };

        self.emit(
            ConsoleFormatter::format_run(&output),
            ConsoleFormatter::format_json(&serde_json::json!({
                "session": output.session,
                "published_id": output.published_id,
                "publish_error": output.publish_error,
                "elapsed_ms": output.elapsed.as_millis() as u64,
            })),
        );
        Ok(())
    }

    async fn session(&self, cmd: &SessionCommand) -> Result<()> {
        let store = self.store()?;
        match cmd {
            SessionCommand::List => {
                let sessions = store.list().await?;
                self.emit(
                    ConsoleFormatter::format_session_list(&sessions),
                    ConsoleFormatter::format_json(&sessions),
                );
            }
            SessionCommand::Show { id } => {
                let session = store.load(&SessionId::from(id.as_str())).await?;
                self.emit(
                    ConsoleFormatter::format_session(&session),
                    ConsoleFormatter::format_json(&session),
                );
            }
        }
        Ok(())
    }
}

//! Lake CLI
//!
//! Main entry point for the `lake` command-line tool.
//! Ingests documents into a persistent vector collection, queries it by
//! semantic similarity and deletes documents by id.

mod commands;

use clap::{Parser, Subcommand};
use commands::{DeleteCommand, IngestCommand, QueryCommand};
use lake_core::{logging, AppConfig, AppResult, BackendKind, ConfigOverrides, IngestMode};
use lake_vector::{CallOptions, DeleteRequest, IngestionRequest, QueryRequest, VectorService};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

/// Lake - document ingestion and semantic search over a vector collection
#[derive(Parser, Debug)]
#[command(name = "lake")]
#[command(about = "Document ingestion and semantic search over a vector collection", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the persistent collections
    #[arg(long, global = true, env = "VECTOR_PERSIST_DIRECTORY")]
    persist_directory: Option<PathBuf>,

    /// Collection to operate on
    #[arg(long, global = true, env = "VECTOR_COLLECTION_NAME")]
    collection_name: Option<String>,

    /// Embedding backend (remote, local)
    #[arg(long, global = true, env = "VECTOR_EMBEDDING_BACKEND")]
    embedding_backend: Option<BackendKind>,

    /// Embedding model identifier
    #[arg(long, global = true, env = "VECTOR_EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    /// Behaviour for ids already in the collection (upsert, strict)
    #[arg(long, global = true, env = "VECTOR_INGEST_MODE")]
    ingest_mode: Option<IngestMode>,

    /// Deadline in seconds for each embedding and store call
    #[arg(long, global = true, env = "VECTOR_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Path to config file
    #[arg(short, long, global = true, env = "VECTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest documents with metadata and ids
    Ingest(IngestCommand),

    /// Rank stored documents by similarity to a text
    Query(QueryCommand),

    /// Delete documents by id
    Delete(DeleteCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest(_) => "ingest",
            Commands::Query(_) => "query",
            Commands::Delete(_) => "delete",
        }
    }
}

/// A command whose input has passed validation.
enum Prepared<'a> {
    Ingest(&'a IngestCommand, IngestionRequest),
    Query(&'a QueryCommand, QueryRequest),
    Delete(&'a DeleteCommand, DeleteRequest),
}

impl Commands {
    /// Validate the command input. Touches neither the backend nor the store.
    fn prepare(&self, config: &AppConfig) -> AppResult<Prepared<'_>> {
        Ok(match self {
            Commands::Ingest(cmd) => Prepared::Ingest(cmd, cmd.prepare()?),
            Commands::Query(cmd) => Prepared::Query(cmd, cmd.prepare(config.max_top_k)?),
            Commands::Delete(cmd) => Prepared::Delete(cmd, cmd.prepare()?),
        })
    }
}

impl Prepared<'_> {
    async fn execute(self, service: &VectorService, opts: &CallOptions) -> AppResult<()> {
        match self {
            Prepared::Ingest(cmd, request) => cmd.execute(service, request, opts).await,
            Prepared::Query(cmd, request) => cmd.execute(service, request, opts).await,
            Prepared::Delete(cmd, request) => cmd.execute(service, request, opts).await,
        }
    }
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            persist_directory: self.persist_directory.clone(),
            collection_name: self.collection_name.clone(),
            embedding_backend: self.embedding_backend,
            embedding_model: self.embedding_model.clone(),
            ingest_mode: self.ingest_mode,
            timeout_secs: self.timeout_secs,
            log_level: self.log_level.clone(),
            verbose: self.verbose,
            no_color: self.no_color,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = %e.kind(), "Command failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    // Defaults < config file < environment < flags
    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(cli.overrides());

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Lake CLI starting");
    tracing::debug!("Persist directory: {:?}", config.persist_directory);
    tracing::debug!("Collection: {}", config.collection_name);
    tracing::debug!("Embedding backend: {}", config.embedding_backend);

    let span = tracing::info_span!("command", name = cli.command.name());
    let result = dispatch(&cli.command, config).instrument(span).await;

    if result.is_ok() {
        tracing::info!("Command completed successfully");
    }

    result
}

/// Check configuration, validate input, then open the service and run.
///
/// Nothing is created on disk until both checks pass.
async fn dispatch(command: &Commands, config: AppConfig) -> AppResult<()> {
    config.validate()?;
    let prepared = command.prepare(&config)?;

    let service = VectorService::open(config)?;

    let opts = service.call_options();
    let cancel = opts.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });

    prepared.execute(&service, &opts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "lake",
            "--persist-directory",
            "/tmp/lake",
            "--collection-name",
            "notes",
            "--embedding-backend",
            "openai",
            "--ingest-mode",
            "strict",
            "delete",
            "a",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.persist_directory, Some(PathBuf::from("/tmp/lake")));
        assert_eq!(overrides.collection_name.as_deref(), Some("notes"));
        assert_eq!(overrides.embedding_backend, Some(BackendKind::Remote));
        assert_eq!(overrides.ingest_mode, Some(IngestMode::Strict));
        assert_eq!(cli.command.name(), "delete");
    }

    #[test]
    fn test_no_color_accepts_conventional_env_values() {
        std::env::set_var("NO_COLOR", "1");
        let result = Cli::try_parse_from(["lake", "delete", "a"]);
        std::env::remove_var("NO_COLOR");

        let cli = result.unwrap();
        assert!(cli.no_color);

        let cli = Cli::try_parse_from(["lake", "--no-color", "delete", "a"]).unwrap();
        assert!(cli.no_color);
    }

    fn disk_config(root: &std::path::Path) -> AppConfig {
        AppConfig {
            persist_directory: root.join("db"),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_invalid_query_creates_nothing_on_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let cli = Cli::try_parse_from(["lake", "query", "--text", "x", "--top-k", "0"]).unwrap();

        let err = dispatch(&cli.command, disk_config(temp.path())).await.unwrap_err();
        assert_eq!(err.kind(), lake_core::ErrorKind::InvalidTopK);
        assert!(!temp.path().join("db").exists());
    }

    #[tokio::test]
    async fn test_invalid_ingest_creates_nothing_on_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let cli = Cli::try_parse_from(["lake", "ingest", "{invalid"]).unwrap();

        let err = dispatch(&cli.command, disk_config(temp.path())).await.unwrap_err();
        assert_eq!(err.kind(), lake_core::ErrorKind::MalformedJson);
        assert!(!temp.path().join("db").exists());
    }

    #[tokio::test]
    async fn test_missing_credential_reported_before_input_errors() {
        let temp = tempfile::TempDir::new().unwrap();
        let cli = Cli::try_parse_from(["lake", "delete", ""]).unwrap();
        let config = AppConfig {
            embedding_backend: BackendKind::Remote,
            ..disk_config(temp.path())
        };

        let err = dispatch(&cli.command, config).await.unwrap_err();
        assert_eq!(err.kind(), lake_core::ErrorKind::CredentialMissing);
        assert!(!temp.path().join("db").exists());
    }

    #[tokio::test]
    async fn test_valid_delete_opens_collection() {
        let temp = tempfile::TempDir::new().unwrap();
        let cli = Cli::try_parse_from(["lake", "delete", "absent"]).unwrap();

        dispatch(&cli.command, disk_config(temp.path())).await.unwrap();
        assert!(temp.path().join("db").join("lake.sqlite").exists());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = Cli::try_parse_from(["lake", "--embedding-backend", "chroma", "query", "--text", "x"]);
        assert!(result.is_err());
    }
}

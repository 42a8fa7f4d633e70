//! Configuration management for the Lake vector service.
//!
//! Configuration is resolved once at startup from several layers, later
//! layers overriding earlier ones:
//! - Built-in defaults
//! - YAML config file (`VECTOR_CONFIG` or `--config`)
//! - Environment variables (a `.env` file is loaded first if present)
//! - Command-line flags
//!
//! The resulting [`AppConfig`] is a read-only snapshot; nothing mutates it
//! after the service is constructed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PERSIST_DIRECTORY: &str = "db";
pub const DEFAULT_COLLECTION_NAME: &str = "lake";
pub const DEFAULT_MAX_TOP_K: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Which embedding backend the service is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// External embedding provider reached over HTTP with a credential
    #[serde(alias = "openai")]
    Remote,
    /// Deterministic offline hashing backend
    #[serde(alias = "simple")]
    Local,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" | "openai" => Ok(Self::Remote),
            "local" | "simple" => Ok(Self::Local),
            other => Err(AppError::Config(format!(
                "Unsupported embedding backend '{}'. Expected 'remote' or 'local'.",
                other
            ))),
        }
    }
}

/// How ingestion treats ids that already exist in the collection.
///
/// `Strict` checks for existing ids before writing. The check and the write
/// are separate store calls, so two concurrent strict ingests of the same
/// new id can both pass the check; the later write wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Insert or overwrite by id
    #[default]
    #[serde(alias = "overwrite")]
    Upsert,
    /// Reject the whole batch if any id is already stored
    #[serde(alias = "reject")]
    Strict,
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upsert => f.write_str("upsert"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

impl FromStr for IngestMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upsert" | "overwrite" => Ok(Self::Upsert),
            "strict" | "reject" => Ok(Self::Strict),
            other => Err(AppError::Config(format!(
                "Unsupported ingest mode '{}'. Expected 'upsert' or 'strict'.",
                other
            ))),
        }
    }
}

/// Opaque provider credential. Never printed, never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a credential; blank values count as absent.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the persistent collections
    pub persist_directory: PathBuf,

    /// Collection that operations target
    pub collection_name: String,

    /// Embedding backend selection
    pub embedding_backend: BackendKind,

    /// Embedding model; `None` picks the backend's default
    pub embedding_model: Option<String>,

    /// Vector dimensionality; `None` picks the backend's default
    pub embedding_dimensions: Option<usize>,

    /// Base URL of the remote embedding API
    pub embedding_endpoint: Option<String>,

    /// HTTP timeout for the remote backend
    pub request_timeout_secs: u64,

    /// Provider credential (required for the remote backend)
    #[serde(skip)]
    pub api_key: Option<Secret>,

    /// Overwrite-vs-reject policy for ids already in the collection
    pub ingest_mode: IngestMode,

    /// Upper bound accepted for `top_k`
    pub max_top_k: usize,

    /// Per-call deadline for backend and store calls
    pub timeout_secs: Option<u64>,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log filter override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Config file structure (`camelCase` keys).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    store: Option<StoreSection>,
    embedding: Option<EmbeddingSection>,
    query: Option<QuerySection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSection {
    persist_directory: Option<PathBuf>,
    collection_name: Option<String>,
    ingest_mode: Option<IngestMode>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingSection {
    backend: Option<BackendKind>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
    request_timeout_secs: Option<u64>,
    /// Name of the environment variable holding the credential
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuerySection {
    max_top_k: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub persist_directory: Option<PathBuf>,
    pub collection_name: Option<String>,
    pub embedding_backend: Option<BackendKind>,
    pub embedding_model: Option<String>,
    pub ingest_mode: Option<IngestMode>,
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            persist_directory: PathBuf::from(DEFAULT_PERSIST_DIRECTORY),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            embedding_backend: BackendKind::Local, // Offline-first default
            embedding_model: None,
            embedding_dimensions: None,
            embedding_endpoint: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            api_key: None,
            ingest_mode: IngestMode::Upsert,
            max_top_k: DEFAULT_MAX_TOP_K,
            timeout_secs: None,
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env`, the optional YAML file and the
    /// process environment.
    ///
    /// Environment variables:
    /// - `VECTOR_CONFIG`: Path to a YAML config file
    /// - `VECTOR_PERSIST_DIRECTORY`: Directory for persistent collections
    /// - `VECTOR_COLLECTION_NAME`: Target collection
    /// - `VECTOR_EMBEDDING_BACKEND`: `remote` or `local`
    /// - `VECTOR_EMBEDDING_MODEL`: Embedding model
    /// - `VECTOR_EMBEDDING_DIMENSIONS`: Vector length
    /// - `VECTOR_EMBEDDING_ENDPOINT`: Remote API base URL
    /// - `VECTOR_API_KEY` / `OPENAI_KEY`: Provider credential
    /// - `VECTOR_INGEST_MODE`: `upsert` or `strict`
    /// - `VECTOR_MAX_TOP_K`: Maximum accepted `top_k`
    /// - `VECTOR_TIMEOUT_SECS`: Per-call deadline
    /// - `RUST_LOG`, `NO_COLOR`
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {:?}", path);
        }

        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with an explicit environment lookup.
    pub fn load_with<F>(config_file: Option<&Path>, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.config_file = config_file
            .map(Path::to_path_buf)
            .or_else(|| env("VECTOR_CONFIG").map(PathBuf::from));

        let mut api_key_env = None;
        if let Some(path) = config.config_file.clone() {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {:?}",
                    path
                )));
            }
            api_key_env = config.merge_yaml(&path)?;
        }

        config.apply_env(&env, api_key_env.as_deref())?;

        Ok(config)
    }

    /// Merge a YAML config file. Returns the credential variable name if the
    /// file names one.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<Option<String>> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(store) = file.store {
            if let Some(dir) = store.persist_directory {
                self.persist_directory = dir;
            }
            if let Some(name) = store.collection_name {
                self.collection_name = name;
            }
            if let Some(mode) = store.ingest_mode {
                self.ingest_mode = mode;
            }
            if store.timeout_secs.is_some() {
                self.timeout_secs = store.timeout_secs;
            }
        }

        let mut api_key_env = None;
        if let Some(embedding) = file.embedding {
            if let Some(backend) = embedding.backend {
                self.embedding_backend = backend;
            }
            if embedding.model.is_some() {
                self.embedding_model = embedding.model;
            }
            if embedding.dimensions.is_some() {
                self.embedding_dimensions = embedding.dimensions;
            }
            if embedding.endpoint.is_some() {
                self.embedding_endpoint = embedding.endpoint;
            }
            if let Some(secs) = embedding.request_timeout_secs {
                self.request_timeout_secs = secs;
            }
            api_key_env = embedding.api_key_env;
        }

        if let Some(max_top_k) = file.query.and_then(|q| q.max_top_k) {
            self.max_top_k = max_top_k;
        }

        if let Some(logging) = file.logging {
            if logging.level.is_some() {
                self.log_level = logging.level;
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(api_key_env)
    }

    fn apply_env<F>(&mut self, env: &F, api_key_env: Option<&str>) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = env("VECTOR_PERSIST_DIRECTORY") {
            self.persist_directory = PathBuf::from(dir);
        }

        if let Some(name) = env("VECTOR_COLLECTION_NAME") {
            self.collection_name = name;
        }

        if let Some(backend) = env("VECTOR_EMBEDDING_BACKEND") {
            self.embedding_backend = backend.parse()?;
        }

        if let Some(model) = env("VECTOR_EMBEDDING_MODEL") {
            self.embedding_model = Some(model);
        }

        if let Some(dims) = env("VECTOR_EMBEDDING_DIMENSIONS") {
            self.embedding_dimensions = Some(parse_number("VECTOR_EMBEDDING_DIMENSIONS", &dims)?);
        }

        if let Some(endpoint) = env("VECTOR_EMBEDDING_ENDPOINT") {
            self.embedding_endpoint = Some(endpoint);
        }

        if let Some(mode) = env("VECTOR_INGEST_MODE") {
            self.ingest_mode = mode.parse()?;
        }

        if let Some(max) = env("VECTOR_MAX_TOP_K") {
            self.max_top_k = parse_number("VECTOR_MAX_TOP_K", &max)?;
        }

        if let Some(secs) = env("VECTOR_TIMEOUT_SECS") {
            self.timeout_secs = Some(parse_number("VECTOR_TIMEOUT_SECS", &secs)?);
        }

        // Credential: explicit variable, then the one named in the config file,
        // then the historical OPENAI_KEY.
        self.api_key = env("VECTOR_API_KEY")
            .and_then(Secret::new)
            .or_else(|| api_key_env.and_then(|name| env(name)).and_then(Secret::new))
            .or_else(|| env("OPENAI_KEY").and_then(Secret::new));

        if let Some(level) = env("RUST_LOG") {
            self.log_level = Some(level);
        }

        if env("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over the config file and environment.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(dir) = overrides.persist_directory {
            self.persist_directory = dir;
        }

        if let Some(name) = overrides.collection_name {
            self.collection_name = name;
        }

        if let Some(backend) = overrides.embedding_backend {
            self.embedding_backend = backend;
        }

        if let Some(model) = overrides.embedding_model {
            self.embedding_model = Some(model);
        }

        if let Some(mode) = overrides.ingest_mode {
            self.ingest_mode = mode;
        }

        if let Some(secs) = overrides.timeout_secs {
            self.timeout_secs = Some(secs);
        }

        if let Some(level) = overrides.log_level {
            self.log_level = Some(level);
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate the snapshot before any service is built.
    ///
    /// A missing credential for the remote backend is a startup failure.
    pub fn validate(&self) -> AppResult<()> {
        if self.embedding_backend == BackendKind::Remote && self.api_key.is_none() {
            return Err(AppError::CredentialMissing(
                "VECTOR_API_KEY (or OPENAI_KEY) must be set when using the remote embedding backend"
                    .to_string(),
            ));
        }

        let name = self.collection_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(AppError::Config(format!(
                "Invalid collection name: '{}'",
                self.collection_name
            )));
        }

        if self.max_top_k == 0 {
            return Err(AppError::Config("max_top_k must be at least 1".to_string()));
        }

        if self.embedding_dimensions == Some(0) {
            return Err(AppError::Config(
                "Embedding dimensions must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the SQLite file backing the configured collection.
    pub fn store_path(&self) -> PathBuf {
        self.persist_directory
            .join(format!("{}.sqlite", self.collection_name))
    }

    /// Ensure the persistence directory exists.
    pub fn ensure_persist_dir(&self) -> AppResult<()> {
        if !self.persist_directory.exists() {
            std::fs::create_dir_all(&self.persist_directory).map_err(|e| {
                AppError::Config(format!(
                    "Failed to create persistence directory {:?}: {}",
                    self.persist_directory, e
                ))
            })?;
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.persist_directory, PathBuf::from("db"));
        assert_eq!(config.collection_name, "lake");
        assert_eq!(config.embedding_backend, BackendKind::Local);
        assert_eq!(config.ingest_mode, IngestMode::Upsert);
        assert_eq!(config.max_top_k, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("remote".parse::<BackendKind>().unwrap(), BackendKind::Remote);
        assert_eq!("OpenAI".parse::<BackendKind>().unwrap(), BackendKind::Remote);
        assert_eq!("simple".parse::<BackendKind>().unwrap(), BackendKind::Local);
        let err = "chroma".parse::<BackendKind>().unwrap_err();
        assert!(err.to_string().contains("Unsupported embedding backend"));
    }

    #[test]
    fn test_env_layer() {
        let config = AppConfig::load_with(
            None,
            env_of(&[
                ("VECTOR_PERSIST_DIRECTORY", "/tmp/vectors"),
                ("VECTOR_COLLECTION_NAME", "recipes"),
                ("VECTOR_EMBEDDING_BACKEND", "openai"),
                ("VECTOR_INGEST_MODE", "strict"),
                ("VECTOR_MAX_TOP_K", "25"),
                ("OPENAI_KEY", "sk-test"),
            ]),
        )
        .unwrap();

        assert_eq!(config.persist_directory, PathBuf::from("/tmp/vectors"));
        assert_eq!(config.collection_name, "recipes");
        assert_eq!(config.embedding_backend, BackendKind::Remote);
        assert_eq!(config.ingest_mode, IngestMode::Strict);
        assert_eq!(config.max_top_k, 25);
        assert_eq!(config.api_key.as_ref().map(Secret::expose), Some("sk-test"));
        assert_eq!(
            config.store_path(),
            PathBuf::from("/tmp/vectors").join("recipes.sqlite")
        );
    }

    #[test]
    fn test_invalid_env_value_is_config_error() {
        let result = AppConfig::load_with(None, env_of(&[("VECTOR_MAX_TOP_K", "many")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_yaml_then_env_precedence() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lake.yaml");
        std::fs::write(
            &path,
            r#"
store:
  persistDirectory: /data/lake
  collectionName: from-file
  ingestMode: strict
embedding:
  backend: remote
  model: text-embedding-3-small
  dimensions: 1536
  apiKeyEnv: MY_EMBEDDING_KEY
query:
  maxTopK: 10
logging:
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig::load_with(
            Some(&path),
            env_of(&[
                ("VECTOR_COLLECTION_NAME", "from-env"),
                ("MY_EMBEDDING_KEY", "sk-file"),
            ]),
        )
        .unwrap();

        assert_eq!(config.persist_directory, PathBuf::from("/data/lake"));
        assert_eq!(config.collection_name, "from-env");
        assert_eq!(config.ingest_mode, IngestMode::Strict);
        assert_eq!(config.embedding_backend, BackendKind::Remote);
        assert_eq!(config.embedding_model.as_deref(), Some("text-embedding-3-small"));
        assert_eq!(config.embedding_dimensions, Some(1536));
        assert_eq!(config.max_top_k, 10);
        assert!(config.no_color);
        assert_eq!(config.api_key.as_ref().map(Secret::expose), Some("sk-file"));
    }

    #[test]
    fn test_missing_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.yaml");
        let result = AppConfig::load_with(Some(&path), env_of(&[]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(ConfigOverrides {
            collection_name: Some("override".to_string()),
            embedding_backend: Some(BackendKind::Remote),
            ingest_mode: Some(IngestMode::Strict),
            verbose: true,
            ..Default::default()
        });

        assert_eq!(config.collection_name, "override");
        assert_eq!(config.embedding_backend, BackendKind::Remote);
        assert_eq!(config.ingest_mode, IngestMode::Strict);
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_remote_without_credential_fails_validation() {
        let mut config = AppConfig::default();
        config.embedding_backend = BackendKind::Remote;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::CredentialMissing);

        config.api_key = Secret::new("sk-test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        assert!(Secret::new("   ").is_none());
        let secret = Secret::new("sk-live").unwrap();
        assert_eq!(format!("{:?}", secret), "Secret(***)");
    }

    #[test]
    fn test_validate_collection_name() {
        let mut config = AppConfig::default();
        config.collection_name = "../escape".to_string();
        assert!(config.validate().is_err());
    }
}

//! Error types for the Lake vector service.
//!
//! This module defines a unified error enum covering request validation,
//! embedding backends, the vector store, and the ambient concerns
//! (configuration, I/O, serialization). Every variant maps to a
//! machine-checkable [`ErrorKind`].

use std::fmt;
use thiserror::Error;

/// Unified error type for the Lake vector service.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// The raw payload is not valid JSON (or not a JSON object)
    #[error("Invalid JSON payload provided. {0}")]
    MalformedJson(String),

    /// Required payload keys are absent
    #[error("Payload is missing required keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    /// documents/metadatas/ids do not align
    #[error(
        "documents, metadatas and ids must have the same length \
         (documents={documents}, metadatas={metadatas}, ids={ids})"
    )]
    ShapeMismatch {
        documents: usize,
        metadatas: usize,
        ids: usize,
    },

    /// Repeated ids within one request
    #[error("Duplicate ids: {}", .0.join(", "))]
    DuplicateIds(Vec<String>),

    /// Ids already present in the collection (strict insert)
    #[error("Duplicate ids already present in collection: {}", .0.join(", "))]
    ExistingIds(Vec<String>),

    /// Metadata is neither a flat JSON object nor key=value pairs
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    /// top_k is not positive or exceeds the configured maximum
    #[error("Invalid top_k: {0}")]
    InvalidTopK(String),

    /// A request field has the wrong type or is empty
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// Remote backend selected without a credential
    #[error("Credential missing: {0}")]
    CredentialMissing(String),

    /// Embedding provider failure (network, auth, quota, bad response)
    #[error("Embedding backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Vector store failure
    #[error("Store error: {0}")]
    Store(String),

    /// A backend or store call exceeded its deadline or was cancelled
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Machine-checkable classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedJson,
    MissingKeys,
    ShapeMismatch,
    DuplicateIds,
    MalformedMetadata,
    InvalidTopK,
    InvalidField,
    CredentialMissing,
    BackendUnavailable,
    StoreError,
    Timeout,
    Config,
    Io,
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedJson => "malformed_json",
            Self::MissingKeys => "missing_keys",
            Self::ShapeMismatch => "shape_mismatch",
            Self::DuplicateIds => "duplicate_ids",
            Self::MalformedMetadata => "malformed_metadata",
            Self::InvalidTopK => "invalid_top_k",
            Self::InvalidField => "invalid_field",
            Self::CredentialMissing => "credential_missing",
            Self::BackendUnavailable => "backend_unavailable",
            Self::StoreError => "store_error",
            Self::Timeout => "timeout",
            Self::Config => "config",
            Self::Io => "io",
            Self::Serialization => "serialization",
        }
    }

    /// Request validation failures. These are raised before any side effect
    /// and retrying the same request cannot succeed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MalformedJson
                | Self::MissingKeys
                | Self::ShapeMismatch
                | Self::DuplicateIds
                | Self::MalformedMetadata
                | Self::InvalidTopK
                | Self::InvalidField
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedJson(_) => ErrorKind::MalformedJson,
            Self::MissingKeys(_) => ErrorKind::MissingKeys,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::DuplicateIds(_) | Self::ExistingIds(_) => ErrorKind::DuplicateIds,
            Self::MalformedMetadata(_) => ErrorKind::MalformedMetadata,
            Self::InvalidTopK(_) => ErrorKind::InvalidTopK,
            Self::InvalidField { .. } => ErrorKind::InvalidField,
            Self::CredentialMissing(_) => ErrorKind::CredentialMissing,
            Self::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Self::Store(_) => ErrorKind::StoreError,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

//! Lake Core Library
//!
//! This crate provides the foundational utilities shared by the vector
//! service and the `lake` CLI:
//! - Error handling (`AppError`, `ErrorKind`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, BackendKind, ConfigOverrides, IngestMode, Secret};
pub use error::{AppError, AppResult, ErrorKind};

//! Embedding backends.
//!
//! A backend turns texts into fixed-length vectors. The backend is chosen
//! once, when the service is built, and never changes afterwards.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingBackendConfig;
pub use provider::{create_backend, EmbeddingBackend, EmbeddingProvider};

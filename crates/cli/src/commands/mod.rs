//! Command handlers for the Lake CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod delete;
pub mod ingest;
pub mod query;

// Re-export command types for convenience
pub use delete::DeleteCommand;
pub use ingest::IngestCommand;
pub use query::QueryCommand;

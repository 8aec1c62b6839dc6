//! # Quizseed - reference text setup for the anatomy quiz store
//!
//! One-shot migration and data import against a PostgREST table API.
//!
//! Quizseed provides:
//! - A schema presence check with an optional `psql`-backed DDL step
//! - An idempotent importer for reference texts keyed by `text_id`
//! - A linker that attaches reference texts to quiz questions
//! - A `DataStore` seam with REST, in-memory and dry-run implementations

pub mod config;
pub mod store;
pub mod schema;
pub mod import;
pub mod linker;
pub mod pipeline;
pub mod ui;

// Re-exports for convenient access
pub use config::Settings;
pub use store::{DataStore, InsertOutcome, MemoryStore, Query, RestStore, Row};
pub use pipeline::{Pipeline, RunOutcome};

/// Result type alias for Quizseed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Quizseed operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment file not found: {0}")]
    MissingEnvFile(std::path::PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{method} {table} failed: {status} {body}")]
    Http {
        method: &'static str,
        table: String,
        status: u16,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingEnvFile(_) | Self::Config(_) | Self::Toml(_) => 2,
            _ => 1,
        }
    }
}

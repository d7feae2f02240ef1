//! Carros crawler: a two-stage used-car listing harvester
//!
//! This crate walks a paginated listing index, follows every listing to its
//! detail page, normalizes the scraped text into structured records, and
//! uploads each finalized batch as a timestamped CSV object.

pub mod clock;
pub mod config;
pub mod crawler;
pub mod export;
pub mod parsing;
pub mod record;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Parser setup failed: {0}")]
    Selector(#[from] parsing::SelectorError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
}

/// Why a single document request failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchCause {
    #[error("unexpected status {0}")]
    Status(u16),

    #[error("{0}")]
    Transport(String),
}

/// A failed document request. Never retried.
#[derive(Debug, Clone, Error)]
#[error("Fetch failed for {url}: {cause}")]
pub struct FetchError {
    pub url: String,
    pub cause: FetchCause,
}

/// Errors raised while serializing or uploading a finalized batch
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Refusing to export an empty batch")]
    EmptyBatch,

    #[error("Failed to serialize batch: {0}")]
    Serialize(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload of {key} failed (local copy kept at {}): {cause}", .path.display())]
    Upload {
        key: String,
        path: std::path::PathBuf,
        cause: String,
    },

    #[error("Upload of {key} failed and no local copy could be written ({write}): {cause}")]
    Unsaved {
        key: String,
        write: String,
        cause: String,
    },
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use record::{EnrichedRecord, ItemStub, RecordBatch};

//! Lumen: a self-hosted site search engine
//!
//! This crate crawls a configured set of websites, builds a per-site
//! lemma index over the fetched pages, and answers ranked keyword
//! queries with highlighted snippets over an HTTP API.

pub mod api;
pub mod config;
pub mod crawler;
pub mod indexer;
pub mod lemma;
pub mod robots;
pub mod search;
pub mod stats;
pub mod storage;

use thiserror::Error;

/// Main error type for Lumen operations
#[derive(Debug, Error)]
pub enum LumenError {
    #[error("Indexing is already running")]
    AlreadyRunning,

    #[error("Indexing is not running")]
    NotRunning,

    #[error("URL is outside the configured sites: {url}")]
    OutOfScope { url: String },

    #[error("Empty search query")]
    EmptyQuery,

    #[error("Requested site is not indexed")]
    SiteNotIndexed,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl error: {0}")]
    Crawl(String),
}

impl LumenError {
    /// True for misuse/validation failures that the API boundary maps to
    /// client-error responses; everything else is a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning
                | Self::NotRunning
                | Self::OutOfScope { .. }
                | Self::EmptyQuery
                | Self::SiteNotIndexed
        )
    }
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
}

/// Result type alias for Lumen operations
pub type Result<T> = std::result::Result<T, LumenError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use indexer::{IndexingController, PageIndexer};
pub use lemma::LemmaExtractor;
pub use search::SearchEngine;
pub use storage::{SqliteStorage, Storage};

//! Configuration module for Lumen
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files: the crawled site list, crawler behavior, the API bind address,
//! and the storage location.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, ServerConfig, SiteEntry, StorageConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::load_config;

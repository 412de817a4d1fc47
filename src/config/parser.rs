//! Configuration file loading

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use std::fs;
use std::path::Path;

/// Loads and validates a configuration file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to read, parse, or validate
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    validate(&config)?;

    // Site roots act as string prefixes for scope checks and path
    // derivation; a trailing slash would shift every derived path.
    for site in &mut config.sites {
        while site.url.ends_with('/') {
            site.url.pop();
        }
    }

    Ok(config)
}

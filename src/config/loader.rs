//! Configuration file loader
//! Reads `AppConfig` from a TOML file; missing keys fall back to defaults.

use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::AppConfig;
use crate::error::LedgerError;

pub fn load_from_file(path: impl AsRef<Path>) -> Result<AppConfig, LedgerError> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    if !path.exists() {
        return Err(LedgerError::Config(format!(
            "Configuration file not found: {:?}",
            path
        )));
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| LedgerError::Config(format!("Failed to read {:?}: {}", path, e)))?;

    let config = parse(&contents)
        .map_err(|e| LedgerError::Config(format!("Failed to parse {:?}: {}", path, e)))?;

    config.validate()?;
    Ok(config)
}

pub fn parse(contents: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(contents)
}

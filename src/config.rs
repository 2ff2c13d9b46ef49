pub mod loader;

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LedgerError;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 60 * 1024 * 1024;

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "txt", "pdf", "png", "jpg", "jpeg", "gif", "zip", "rar", "doc", "docx", "ppt", "pptx", "xls",
    "xlsx", "py", "js", "html", "css", "json", "csv", "md",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    pub max_upload_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub append_max_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://hashvault.db".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 5000,
            max_connections: 5,
            busy_timeout_secs: 5,
            ledger: LedgerConfig::default(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            append_max_attempts: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from `HASHVAULT_CONFIG` (if set) and then apply
    /// environment overrides.
    pub fn load() -> Result<Self, LedgerError> {
        let mut config = match env::var("HASHVAULT_CONFIG") {
            Ok(path) => loader::load_from_file(path)?,
            Err(_) => AppConfig::default(),
        };

        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(host) = env::var("SERVER_HOST") {
            config.server_host = host;
        }
        if let Some(port) = parse_env("SERVER_PORT")? {
            config.server_port = port;
        }
        if let Some(max) = parse_env("DB_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(secs) = parse_env("DB_BUSY_TIMEOUT_SECS")? {
            config.busy_timeout_secs = secs;
        }
        if let Some(bytes) = parse_env("MAX_UPLOAD_BYTES")? {
            config.ledger.max_upload_bytes = bytes;
        }
        if let Ok(list) = env::var("ALLOWED_EXTENSIONS") {
            config.ledger.allowed_extensions = parse_extension_list(&list);
        }
        if let Some(attempts) = parse_env("APPEND_MAX_ATTEMPTS")? {
            config.ledger.append_max_attempts = attempts;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.database_url.trim().is_empty() {
            return Err(LedgerError::Config("database_url must not be empty".to_string()));
        }
        if self.server_port == 0 {
            return Err(LedgerError::Config("server_port must not be 0".to_string()));
        }
        if self.max_connections == 0 {
            return Err(LedgerError::Config("max_connections must be at least 1".to_string()));
        }
        if self.ledger.max_upload_bytes == 0 {
            return Err(LedgerError::Config("max_upload_bytes must be positive".to_string()));
        }
        if self.ledger.allowed_extensions.is_empty() {
            return Err(LedgerError::Config(
                "allowed_extensions must list at least one extension".to_string(),
            ));
        }
        if self.ledger.append_max_attempts == 0 {
            return Err(LedgerError::Config(
                "append_max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Split a comma-separated extension list, dropping dots and blanks.
pub fn parse_extension_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn parse_env<T>(key: &str) -> Result<Option<T>, LedgerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| LedgerError::Config(format!("Invalid {}={:?}: {}", key, value, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ledger.max_upload_bytes, 62_914_560);
        assert!(config.ledger.allowed_extensions.contains(&"pdf".to_string()));
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn test_parse_extension_list() {
        assert_eq!(
            parse_extension_list(" TXT, .pdf,,md "),
            vec!["txt".to_string(), "pdf".to_string(), "md".to_string()]
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.ledger.append_max_attempts = 0;
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));

        let mut config = AppConfig::default();
        config.ledger.allowed_extensions.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server_port = 0;
        assert!(config.validate().is_err());
    }
}

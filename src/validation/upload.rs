//! Upload Admission Checks
//!
//! Allow-listed extensions, a size ceiling and filename sanitizing. Every
//! check here runs before any content is fingerprinted.

use std::collections::HashSet;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

/// Name used when sanitizing leaves nothing behind.
pub const FALLBACK_FILENAME: &str = "uploaded_file";

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_bytes: u64,
    allowed_extensions: HashSet<String>,
}

impl UploadPolicy {
    pub fn new<I, S>(max_bytes: u64, allowed_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            max_bytes,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.max_upload_bytes, &config.allowed_extensions)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn is_allowed(&self, filename: &str) -> bool {
        extension_of(filename)
            .map(|ext| self.allowed_extensions.contains(&ext))
            .unwrap_or(false)
    }

    /// Check the client-supplied name and return its sanitized form.
    pub fn check_filename(&self, filename: Option<&str>) -> Result<String> {
        let filename = match filename {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(LedgerError::Validation("No file selected".to_string())),
        };

        if !self.is_allowed(filename) {
            return Err(LedgerError::Validation(format!(
                "File type not allowed: {}",
                filename
            )));
        }

        Ok(sanitize_filename(filename))
    }

    pub fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_bytes {
            return Err(LedgerError::PayloadTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// Lowercased text after the last `.`, if there is any.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Reduce a client filename to a safe ASCII basename.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#![allow(dead_code)]

use hashvault::config::LedgerConfig;
use hashvault::database::{Database, LedgerStore, MemoryStore};
use hashvault::ledger::LedgerService;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const HELLO_DIGEST: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

pub const BOUNDARY: &str = "hashvault-test-boundary";

/// Setup an in-memory SQLite database for testing
pub async fn setup_test_db() -> Database {
    Database::new_in_memory()
        .await
        .expect("Failed to create test database")
}

/// Setup a file-backed SQLite database with a real connection pool.
///
/// The returned directory must outlive the database.
pub async fn setup_file_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("ledger.db").display());
    let db = Database::with_options(&url, 8, Duration::from_secs(10))
        .await
        .expect("Failed to open test database");
    db.run_migrations().await.expect("Failed to migrate test database");
    (db, dir)
}

pub fn build_ledger(store: Arc<dyn LedgerStore>) -> LedgerService {
    LedgerService::new(store, &LedgerConfig::default())
}

pub fn build_ledger_with(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> LedgerService {
    LedgerService::new(store, &config)
}

pub fn memory_ledger() -> (Arc<LedgerService>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Arc::new(build_ledger(store.clone())), store)
}

/// One part of a multipart/form-data body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content: &'a [u8],
    },
}

/// Encode `parts` as multipart/form-data, returning the content type header
/// value and the body.
pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Test data fixtures
pub mod fixtures {
    use super::*;
    use hashvault::database::SubmissionRecord;
    use hashvault::ledger::Upload;

    pub async fn submit_files(ledger: &LedgerService, count: usize) -> Vec<SubmissionRecord> {
        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let upload = Upload::new(
                Some(&format!("file_{}.txt", i)),
                Some("text/plain"),
                format!("content {}", i).into_bytes(),
            );
            records.push(ledger.submit(upload).await.expect("Failed to submit fixture"));
        }
        records
    }
}

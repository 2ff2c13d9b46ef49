//! Ledger Service
//!
//! Accepts content, fingerprints it, extends the anchor chain through the
//! store and answers verification queries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::crypto::fingerprint_bytes;
use crate::database::models::{Submission, SubmissionRecord};
use crate::database::store::LedgerStore;
use crate::error::{ConflictKind, LedgerError, Result};
use crate::ledger::anchor::{normalize_timestamp, Anchor};
use crate::ledger::chain::{verify_chain, ChainReport};
use crate::validation::UploadPolicy;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const RETRY_BACKOFF_MS: u64 = 10;

/// Content offered for submission
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
    pub submitted_at: DateTime<Utc>,
}

impl Upload {
    pub fn new(filename: Option<&str>, content_type: Option<&str>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.map(str::to_string),
            content_type: content_type.map(str::to_string),
            content,
            submitted_at: Utc::now(),
        }
    }

    pub fn submitted_at(mut self, submitted_at: DateTime<Utc>) -> Self {
        self.submitted_at = submitted_at;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Authentic,
    Tampered,
}

impl Verdict {
    pub fn status_text(&self) -> &'static str {
        match self {
            Verdict::Authentic => "Authentic - File is unmodified",
            Verdict::Tampered => "Tampered - File has been modified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub verdict: Verdict,
    pub stored_digest: String,
    pub computed_digest: String,
    pub record: SubmissionRecord,
}

impl VerificationResult {
    pub fn is_authentic(&self) -> bool {
        self.verdict == Verdict::Authentic
    }
}

/// `HV-` followed by 12 upper-case hex characters
pub fn generate_submission_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("HV-{}", uuid[..12].to_uppercase())
}

pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    policy: UploadPolicy,
    max_attempts: u32,
    // Serializes appends from this instance only; the store's
    // compare-and-swap is what keeps separate instances apart.
    append_gate: Mutex<()>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self {
            store,
            policy: UploadPolicy::from_config(config),
            max_attempts: config.append_max_attempts.max(1),
            append_gate: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Place content under custody and anchor it at the head of the chain
    pub async fn submit(&self, upload: Upload) -> Result<SubmissionRecord> {
        let filename = self.policy.check_filename(upload.filename.as_deref())?;
        let size = upload.content.len() as u64;
        self.policy.check_size(size)?;

        let content_digest = fingerprint_bytes(&upload.content);
        let content_type = upload
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let mut submission = Submission {
            submission_id: generate_submission_id(),
            filename: Some(filename),
            content_type: Some(content_type),
            size: Some(size as i64),
            content: upload.content,
            content_digest,
            submitted_at: normalize_timestamp(upload.submitted_at),
            anchor_digest: String::new(),
        };

        let _gate = self.append_gate.lock().await;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_append(&mut submission).await {
                Ok(anchor) => {
                    info!(
                        "Anchored {} ({} bytes) at sequence {}",
                        submission.submission_id, size, anchor.sequence_number
                    );
                    return Ok(submission.record(anchor));
                }
                Err(LedgerError::Conflict(kind)) if attempt < self.max_attempts => {
                    warn!(
                        "Append attempt {}/{} for {} conflicted: {}",
                        attempt, self.max_attempts, submission.submission_id, kind
                    );
                    if let ConflictKind::AlreadyAnchored(_) = kind {
                        submission.submission_id = generate_submission_id();
                    }
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64))
                        .await;
                }
                Err(LedgerError::Conflict(kind)) => {
                    return Err(LedgerError::Storage(format!(
                        "Could not anchor submission after {} attempts: {}",
                        attempt, kind
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One read-head, compute-link, write-link round. The head is always read
    /// fresh from the store.
    async fn try_append(&self, submission: &mut Submission) -> Result<Anchor> {
        let head = self.store.read_chain_head().await?;
        let anchor = Anchor::next(
            head.as_ref(),
            &submission.submission_id,
            &submission.content_digest,
            Utc::now(),
        )?;
        submission.anchor_digest = anchor.anchor_digest.clone();
        debug!("Appending {}", anchor.summary());

        self.store.atomic_append(submission, &anchor).await?;
        Ok(anchor)
    }

    /// Compare `content` against what was submitted under `submission_id`
    pub async fn verify(&self, submission_id: &str, content: &[u8]) -> Result<VerificationResult> {
        let record = self
            .store
            .find_submission(submission_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(submission_id.to_string()))?;

        // The stored digest only counts if the anchor still commits to it.
        let anchor = &record.anchor;
        if record.content_digest != anchor.content_digest || !anchor.verify_digest() {
            error!(
                "Submission {} disagrees with anchor #{}",
                submission_id, anchor.sequence_number
            );
            return Err(LedgerError::integrity(
                anchor.sequence_number,
                format!("submission {} no longer matches its anchor", submission_id),
            ));
        }

        let computed_digest = fingerprint_bytes(content);
        let verdict = if computed_digest == record.content_digest {
            Verdict::Authentic
        } else {
            Verdict::Tampered
        };

        match verdict {
            Verdict::Authentic => info!("Verified {}: authentic", submission_id),
            Verdict::Tampered => warn!(
                "Verified {}: tampered (stored {}, computed {})",
                submission_id, record.content_digest, computed_digest
            ),
        }

        Ok(VerificationResult {
            verdict,
            stored_digest: record.content_digest.clone(),
            computed_digest,
            record,
        })
    }

    /// Snapshot of every submission, newest first
    pub async fn list(&self) -> Result<Vec<SubmissionRecord>> {
        self.store.list_submissions().await
    }

    pub async fn chain_head(&self) -> Result<Option<Anchor>> {
        self.store.read_chain_head().await
    }

    /// Re-verify the whole persisted chain
    pub async fn audit_chain(&self) -> Result<ChainReport> {
        let anchors = self.store.list_anchors().await?;
        verify_chain(&anchors)
    }
}

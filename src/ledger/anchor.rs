//! Anchor Records
//!
//! One link of the tamper-evident chain. Each anchor commits to its sequence
//! number, the submission it anchors, that submission's content digest, the
//! time of anchoring and the previous anchor's digest.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::is_valid_digest;
use crate::error::{LedgerError, Result};

/// Domain tag prefixed to every canonical anchor string.
pub const ANCHOR_DOMAIN: &str = "hashvault-anchor-v1";

/// Sequence number of the first anchor in a chain.
pub const GENESIS_SEQUENCE: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub sequence_number: i64,
    pub submission_id: String,
    pub content_digest: String,
    pub anchored_at: DateTime<Utc>,
    /// `None` only for the genesis anchor.
    pub prev_anchor_digest: Option<String>,
    pub anchor_digest: String,
}

impl Anchor {
    /// Build the anchor that extends `head`, or the genesis anchor when the
    /// chain is empty.
    pub fn next(
        head: Option<&Anchor>,
        submission_id: &str,
        content_digest: &str,
        anchored_at: DateTime<Utc>,
    ) -> Result<Self> {
        if submission_id.is_empty() {
            return Err(LedgerError::Validation(
                "Submission id must not be empty".to_string(),
            ));
        }
        if !is_valid_digest(content_digest) {
            return Err(LedgerError::Validation(format!(
                "Malformed content digest {:?}",
                content_digest
            )));
        }

        let (sequence_number, prev_anchor_digest) = match head {
            Some(head) => (head.sequence_number + 1, Some(head.anchor_digest.clone())),
            None => (GENESIS_SEQUENCE, None),
        };

        let mut anchor = Self {
            sequence_number,
            submission_id: submission_id.to_string(),
            content_digest: content_digest.to_string(),
            anchored_at: normalize_timestamp(anchored_at),
            prev_anchor_digest,
            anchor_digest: String::new(),
        };
        anchor.anchor_digest = anchor.calculate_digest();
        Ok(anchor)
    }

    /// Canonical encoding of the five committed fields.
    ///
    /// The submission id is length-prefixed so no choice of id can shift
    /// bytes between fields.
    pub fn canonical_string(&self) -> String {
        format!(
            "{}|seq:{}|id:{}:{}|digest:{}|at:{}|prev:{}",
            ANCHOR_DOMAIN,
            self.sequence_number,
            self.submission_id.len(),
            self.submission_id,
            self.content_digest,
            format_timestamp(&self.anchored_at),
            self.prev_anchor_digest.as_deref().unwrap_or("")
        )
    }

    /// Recompute the digest from the committed fields
    pub fn calculate_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify_digest(&self) -> bool {
        self.anchor_digest == self.calculate_digest()
    }

    pub fn is_genesis(&self) -> bool {
        self.sequence_number == GENESIS_SEQUENCE
    }

    pub fn summary(&self) -> String {
        format!(
            "#{} {} ({} -> {})",
            self.sequence_number,
            self.submission_id,
            self.prev_anchor_digest.as_deref().unwrap_or("genesis"),
            self.anchor_digest
        )
    }
}

/// Drop sub-microsecond precision so the value survives a storage round trip.
pub fn normalize_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

/// Fixed-width RFC 3339 form used both for hashing and for storage.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LedgerError::Storage(format!("Invalid stored timestamp {:?}: {}", value, e)))
}

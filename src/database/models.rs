use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::anchor::Anchor;

/// A piece of content placed under custody, as written to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub submission_id: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<i64>,
    pub content: Vec<u8>,
    pub content_digest: String,
    pub submitted_at: DateTime<Utc>,
    pub anchor_digest: String,
}

impl Submission {
    pub fn record(&self, anchor: Anchor) -> SubmissionRecord {
        SubmissionRecord {
            submission_id: self.submission_id.clone(),
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
            size: self.size,
            content_digest: self.content_digest.clone(),
            submitted_at: self.submitted_at,
            anchor,
        }
    }
}

/// Submission metadata joined with its anchor. Never carries the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub submission_id: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<i64>,
    pub content_digest: String,
    pub submitted_at: DateTime<Utc>,
    pub anchor: Anchor,
}

//! Ledger persistence contract
//!
//! Implementations must be `Send + Sync` and safe for concurrent access. The
//! store, not the caller, is responsible for serializing chain extension.

use async_trait::async_trait;

use crate::database::models::{Submission, SubmissionRecord};
use crate::error::Result;
use crate::ledger::anchor::Anchor;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// The anchor with the highest sequence number, if any.
    async fn read_chain_head(&self) -> Result<Option<Anchor>>;

    /// Write a submission and its anchor as one unit.
    ///
    /// This is a compare-and-swap on the chain head: the write only happens
    /// if `anchor` directly extends the head at the moment of writing.
    /// Otherwise it fails with `Conflict(HeadMoved)` and nothing is written.
    /// An already-anchored submission id fails with
    /// `Conflict(AlreadyAnchored)`.
    async fn atomic_append(&self, submission: &Submission, anchor: &Anchor) -> Result<()>;

    async fn find_submission(&self, submission_id: &str) -> Result<Option<SubmissionRecord>>;

    /// All submissions, newest `submitted_at` first.
    async fn list_submissions(&self) -> Result<Vec<SubmissionRecord>>;

    /// All anchors in ascending sequence order.
    async fn list_anchors(&self) -> Result<Vec<Anchor>>;
}

/// Reject an append whose anchor does not extend `head`.
pub(crate) fn check_extends_head(head: Option<&Anchor>, anchor: &Anchor) -> Result<()> {
    let expected_sequence = head.map(|h| h.sequence_number + 1).unwrap_or(1);
    let expected_prev = head.map(|h| h.anchor_digest.as_str());

    if anchor.sequence_number != expected_sequence
        || anchor.prev_anchor_digest.as_deref() != expected_prev
    {
        return Err(crate::error::LedgerError::head_moved(expected_sequence));
    }
    Ok(())
}

/// Check the submission row and the anchor row describe the same thing.
pub(crate) fn check_pair(submission: &Submission, anchor: &Anchor) -> Result<()> {
    if submission.submission_id != anchor.submission_id
        || submission.content_digest != anchor.content_digest
        || submission.anchor_digest != anchor.anchor_digest
    {
        return Err(crate::error::LedgerError::Validation(format!(
            "Submission {} does not match anchor #{}",
            submission.submission_id, anchor.sequence_number
        )));
    }
    Ok(())
}

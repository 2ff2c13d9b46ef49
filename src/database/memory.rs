//! In-memory ledger store.
//!
//! Intended for tests. It applies the same compare-and-swap rules as the
//! SQLite store, but its state dies with the process and is invisible to other
//! service instances.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::database::models::{Submission, SubmissionRecord};
use crate::database::store::{check_extends_head, check_pair, LedgerStore};
use crate::error::{LedgerError, Result};
use crate::ledger::anchor::Anchor;

#[derive(Default)]
struct MemoryState {
    submissions: HashMap<String, Submission>,
    anchors: Vec<Anchor>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.anchors.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Overwrite a stored anchor in place, bypassing every check.
    ///
    /// Exists so tests can simulate tampering with the persisted chain.
    pub async fn tamper_anchor<F>(&self, sequence_number: i64, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Anchor),
    {
        let mut state = self.state.write().await;
        let anchor = state
            .anchors
            .iter_mut()
            .find(|a| a.sequence_number == sequence_number)
            .ok_or_else(|| LedgerError::NotFound(format!("anchor #{}", sequence_number)))?;
        edit(anchor);
        Ok(())
    }

    fn record_for(state: &MemoryState, submission: &Submission) -> Result<SubmissionRecord> {
        let anchor = state
            .anchors
            .iter()
            .find(|a| a.anchor_digest == submission.anchor_digest)
            .cloned()
            .ok_or_else(|| {
                LedgerError::Storage(format!(
                    "Submission {} has no anchor",
                    submission.submission_id
                ))
            })?;
        Ok(submission.record(anchor))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn read_chain_head(&self) -> Result<Option<Anchor>> {
        Ok(self.state.read().await.anchors.last().cloned())
    }

    async fn atomic_append(&self, submission: &Submission, anchor: &Anchor) -> Result<()> {
        check_pair(submission, anchor)?;

        let mut state = self.state.write().await;
        if state.submissions.contains_key(&submission.submission_id)
            || state
                .anchors
                .iter()
                .any(|a| a.submission_id == anchor.submission_id)
        {
            return Err(LedgerError::already_anchored(&submission.submission_id));
        }
        check_extends_head(state.anchors.last(), anchor)?;

        state.anchors.push(anchor.clone());
        state
            .submissions
            .insert(submission.submission_id.clone(), submission.clone());
        Ok(())
    }

    async fn find_submission(&self, submission_id: &str) -> Result<Option<SubmissionRecord>> {
        let state = self.state.read().await;
        state
            .submissions
            .get(submission_id)
            .map(|s| Self::record_for(&state, s))
            .transpose()
    }

    async fn list_submissions(&self) -> Result<Vec<SubmissionRecord>> {
        let state = self.state.read().await;
        let mut records = state
            .submissions
            .values()
            .map(|s| Self::record_for(&state, s))
            .collect::<Result<Vec<_>>>()?;
        records.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then(b.anchor.sequence_number.cmp(&a.anchor.sequence_number))
        });
        Ok(records)
    }

    async fn list_anchors(&self) -> Result<Vec<Anchor>> {
        Ok(self.state.read().await.anchors.clone())
    }
}

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, warn};

use crate::database::models::{Submission, SubmissionRecord};
use crate::database::store::{check_pair, LedgerStore};
use crate::database::Database;
use crate::error::{ConflictKind, LedgerError, Result};
use crate::ledger::anchor::{format_timestamp, parse_timestamp, Anchor};

const RECORD_COLUMNS: &str = r#"
    s.submission_id, s.filename, s.content_type, s.file_size, s.content_digest, s.submitted_at,
    a.sequence_number, a.submission_id AS anchor_submission_id,
    a.content_digest AS anchor_content_digest, a.anchored_at, a.prev_anchor_digest, a.anchor_digest
"#;

#[async_trait]
impl LedgerStore for Database {
    async fn read_chain_head(&self) -> Result<Option<Anchor>> {
        let row = sqlx::query(
            r#"
            SELECT sequence_number, submission_id, content_digest, anchored_at,
                   prev_anchor_digest, anchor_digest
            FROM anchors
            ORDER BY sequence_number DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(self.pool())
        .await?;

        let head = row.map(|row| anchor_from_row(&row)).transpose()?;
        debug!(
            "Chain head: {}",
            head.as_ref()
                .map(|a| a.sequence_number.to_string())
                .unwrap_or_else(|| "empty".to_string())
        );
        Ok(head)
    }

    async fn atomic_append(&self, submission: &Submission, anchor: &Anchor) -> Result<()> {
        check_pair(submission, anchor)?;

        let prev = anchor.prev_anchor_digest.as_deref().unwrap_or("");
        let anchored_at = format_timestamp(&anchor.anchored_at);

        // Dropping the transaction on any early return rolls it back.
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| append_error(e, &anchor.submission_id))?;

        // Compare-and-swap: the anchor row only lands if it extends the head
        // as it is inside this write transaction.
        let inserted = sqlx::query(
            r#"
            INSERT INTO anchors
                (sequence_number, submission_id, content_digest, anchored_at,
                 prev_anchor_digest, anchor_digest)
            SELECT ?, ?, ?, ?, ?, ?
            WHERE COALESCE((SELECT MAX(sequence_number) FROM anchors), 0) = ?
              AND COALESCE(
                    (SELECT anchor_digest FROM anchors ORDER BY sequence_number DESC LIMIT 1),
                    ''
                  ) = ?
            "#,
        )
        .bind(anchor.sequence_number)
        .bind(&anchor.submission_id)
        .bind(&anchor.content_digest)
        .bind(&anchored_at)
        .bind(prev)
        .bind(&anchor.anchor_digest)
        .bind(anchor.sequence_number - 1)
        .bind(prev)
        .execute(&mut *tx)
        .await
        .map_err(|e| append_error(e, &anchor.submission_id))?;

        if inserted.rows_affected() == 0 {
            warn!(
                "Append of {} lost the race for sequence {}",
                anchor.submission_id, anchor.sequence_number
            );
            return Err(LedgerError::head_moved(anchor.sequence_number));
        }

        sqlx::query(
            r#"
            INSERT INTO submissions
                (submission_id, filename, content_type, file_size, content,
                 content_digest, submitted_at, anchor_digest)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&submission.submission_id)
        .bind(&submission.filename)
        .bind(&submission.content_type)
        .bind(submission.size)
        .bind(&submission.content)
        .bind(&submission.content_digest)
        .bind(format_timestamp(&submission.submitted_at))
        .bind(&submission.anchor_digest)
        .execute(&mut *tx)
        .await
        .map_err(|e| append_error(e, &submission.submission_id))?;

        tx.commit()
            .await
            .map_err(|e| append_error(e, &submission.submission_id))?;
        debug!("Committed {}", anchor.summary());
        Ok(())
    }

    async fn find_submission(&self, submission_id: &str) -> Result<Option<SubmissionRecord>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM submissions s
            JOIN anchors a ON a.anchor_digest = s.anchor_digest
            WHERE s.submission_id = ?
            LIMIT 1
            "#,
            RECORD_COLUMNS
        ))
        .bind(submission_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| record_from_row(&row)).transpose()
    }

    async fn list_submissions(&self) -> Result<Vec<SubmissionRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM submissions s
            JOIN anchors a ON a.anchor_digest = s.anchor_digest
            ORDER BY s.submitted_at DESC, a.sequence_number DESC
            "#,
            RECORD_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn list_anchors(&self) -> Result<Vec<Anchor>> {
        let rows = sqlx::query(
            r#"
            SELECT sequence_number, submission_id, content_digest, anchored_at,
                   prev_anchor_digest, anchor_digest
            FROM anchors
            ORDER BY sequence_number ASC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(anchor_from_row).collect()
    }
}

/// Classify a failure inside the append transaction.
///
/// A taken submission id is `AlreadyAnchored`. SQLITE_BUSY (5), SQLITE_LOCKED
/// (6), SQLITE_BUSY_SNAPSHOT (517) and any other unique violation mean another
/// writer extended the chain first. Everything else is a storage failure.
fn append_error(err: sqlx::Error, submission_id: &str) -> LedgerError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if db_err.message().contains("submission_id") {
                return LedgerError::already_anchored(submission_id);
            }
            return LedgerError::Conflict(ConflictKind::HeadMoved {
                expected_sequence: None,
            });
        }
        if matches!(db_err.code().as_deref(), Some("5") | Some("6") | Some("517")) {
            return LedgerError::Conflict(ConflictKind::HeadMoved {
                expected_sequence: None,
            });
        }
    }
    err.into()
}

fn anchor_from_row(row: &SqliteRow) -> Result<Anchor> {
    let prev: String = row.try_get("prev_anchor_digest")?;
    let anchored_at: String = row.try_get("anchored_at")?;
    Ok(Anchor {
        sequence_number: row.try_get("sequence_number")?,
        submission_id: row.try_get("submission_id")?,
        content_digest: row.try_get("content_digest")?,
        anchored_at: parse_timestamp(&anchored_at)?,
        prev_anchor_digest: if prev.is_empty() { None } else { Some(prev) },
        anchor_digest: row.try_get("anchor_digest")?,
    })
}

fn record_from_row(row: &SqliteRow) -> Result<SubmissionRecord> {
    let prev: String = row.try_get("prev_anchor_digest")?;
    let anchored_at: String = row.try_get("anchored_at")?;
    let submitted_at: String = row.try_get("submitted_at")?;

    let anchor = Anchor {
        sequence_number: row.try_get("sequence_number")?,
        submission_id: row.try_get("anchor_submission_id")?,
        content_digest: row.try_get("anchor_content_digest")?,
        anchored_at: parse_timestamp(&anchored_at)?,
        prev_anchor_digest: if prev.is_empty() { None } else { Some(prev) },
        anchor_digest: row.try_get("anchor_digest")?,
    };

    Ok(SubmissionRecord {
        submission_id: row.try_get("submission_id")?,
        filename: row.try_get("filename")?,
        content_type: row.try_get("content_type")?,
        size: row.try_get("file_size")?,
        content_digest: row.try_get("content_digest")?,
        submitted_at: parse_timestamp(&submitted_at)?,
        anchor,
    })
}

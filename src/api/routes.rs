use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::database::models::SubmissionRecord;
use crate::error::LedgerError;
use crate::ledger::{Anchor, Upload};

/// Raw file part of a multipart request
struct FilePart {
    filename: Option<String>,
    content_type: Option<String>,
    content: Vec<u8>,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "hashvault",
        "timestamp": chrono::Utc::now()
    }))
}

pub async fn submit_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut file = None;
    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() == Some("file") {
            // Refuse disallowed types before reading the body.
            state.ledger.policy().check_filename(field.file_name())?;
            file = Some(read_file_part(field, state.ledger.policy().max_bytes()).await?);
        }
    }
    let file = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    let record = state
        .ledger
        .submit(Upload::new(
            file.filename.as_deref(),
            file.content_type.as_deref(),
            file.content,
        ))
        .await?;

    info!("Submission {} accepted", record.submission_id);

    let mut body = record_json(&record);
    body["message"] = json!("File submitted successfully");
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn verify_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut submission_id = None;
    let mut file = None;
    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("submission_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Malformed submission_id: {}", e)))?;
                submission_id = Some(text.trim().to_string());
            }
            Some("file") => {
                file = Some(read_file_part(field, state.ledger.policy().max_bytes()).await?);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    if file.filename.as_deref().map_or(true, |name| name.is_empty()) {
        return Err(ApiError::bad_request("No file selected"));
    }
    let submission_id = submission_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("No submission_id provided"))?;

    let result = state.ledger.verify(&submission_id, &file.content).await?;
    let record = &result.record;

    Ok(Json(json!({
        "verified": result.is_authentic(),
        "status_text": result.verdict.status_text(),
        "submission_id": record.submission_id,
        "filename": record.filename,
        "stored_digest": result.stored_digest,
        "computed_digest": result.computed_digest,
        "submitted_at": record.submitted_at,
        "anchor": anchor_json(&record.anchor),
    })))
}

pub async fn list_submissions(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let submissions = state.ledger.list().await?;
    let records: Vec<Value> = submissions.iter().map(record_json).collect();

    Ok(Json(json!({
        "count": records.len(),
        "submissions": records,
    })))
}

pub async fn chain_status(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    match state.ledger.audit_chain().await {
        Ok(report) => Ok((
            StatusCode::OK,
            Json(json!({
                "valid": true,
                "length": report.length,
                "head_digest": report.head_digest,
            })),
        )),
        Err(LedgerError::Integrity {
            sequence_number,
            reason,
        }) => {
            warn!("Chain audit failed at sequence {}", sequence_number);
            Ok((
                StatusCode::CONFLICT,
                Json(json!({
                    "valid": false,
                    "sequence_number": sequence_number,
                    "error": reason,
                })),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

async fn next_field(multipart: &mut Multipart) -> Result<Option<Field<'_>>, ApiError> {
    multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))
}

/// Read a file part chunk by chunk, stopping as soon as it passes `limit`.
async fn read_file_part(mut field: Field<'_>, limit: u64) -> Result<FilePart, ApiError> {
    let filename = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);

    let mut content = Vec::new();
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(LedgerError::PayloadTooLarge {
                    size: content.len() as u64,
                    limit,
                }
                .into());
            }
            Err(e) => return Err(ApiError::bad_request(format!("Malformed upload: {}", e))),
        };

        let size = (content.len() + chunk.len()) as u64;
        if size > limit {
            return Err(LedgerError::PayloadTooLarge { size, limit }.into());
        }
        content.extend_from_slice(&chunk);
    }

    Ok(FilePart {
        filename,
        content_type,
        content,
    })
}

fn anchor_json(anchor: &Anchor) -> Value {
    json!({
        "sequence_number": anchor.sequence_number,
        "anchored_at": anchor.anchored_at,
        "anchor_digest": anchor.anchor_digest,
        "prev_anchor_digest": anchor.prev_anchor_digest,
    })
}

fn record_json(record: &SubmissionRecord) -> Value {
    json!({
        "submission_id": record.submission_id,
        "filename": record.filename,
        "content_type": record.content_type,
        "size": record.size,
        "content_digest": record.content_digest,
        "submitted_at": record.submitted_at,
        "anchor": anchor_json(&record.anchor),
    })
}

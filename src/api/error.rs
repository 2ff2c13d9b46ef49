use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::error::LedgerError;

/// Ledger errors rendered as JSON responses
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(LedgerError::Validation(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) | LedgerError::Integrity { .. } => StatusCode::CONFLICT,
            LedgerError::Storage(_) | LedgerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            LedgerError::Validation(message) => json!({
                "error": "Bad request",
                "message": message,
            }),
            LedgerError::PayloadTooLarge { limit, .. } => json!({
                "error": "File too large",
                "message": format!("Maximum file size is {} MB", limit / (1024 * 1024)),
            }),
            LedgerError::NotFound(id) => json!({
                "error": "Not found",
                "message": format!("Submission not found: {}", id),
            }),
            LedgerError::Conflict(kind) => json!({
                "error": "Conflict",
                "message": kind.to_string(),
            }),
            LedgerError::Integrity {
                sequence_number,
                reason,
            } => json!({
                "error": "Chain integrity broken",
                "sequence_number": sequence_number,
                "message": reason,
            }),
            LedgerError::Storage(_) | LedgerError::Config(_) => {
                error!("Request failed: {}", self.0);
                json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

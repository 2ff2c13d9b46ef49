use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Submission not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Chain integrity broken at sequence {sequence_number}: {reason}")]
    Integrity { sequence_number: i64, reason: String },
}

/// Why an append lost against the current chain state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    AlreadyAnchored(String),
    HeadMoved { expected_sequence: Option<i64> },
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyAnchored(id) => write!(f, "submission {} is already anchored", id),
            Self::HeadMoved {
                expected_sequence: Some(seq),
            } => write!(f, "chain head moved (expected next sequence {})", seq),
            Self::HeadMoved {
                expected_sequence: None,
            } => write!(f, "chain head moved"),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(format!("Database error: {}", err))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("I/O error: {}", err))
    }
}

impl LedgerError {
    pub fn head_moved(expected_sequence: i64) -> Self {
        Self::Conflict(ConflictKind::HeadMoved {
            expected_sequence: Some(expected_sequence),
        })
    }

    pub fn already_anchored(submission_id: &str) -> Self {
        Self::Conflict(ConflictKind::AlreadyAnchored(submission_id.to_string()))
    }

    pub fn integrity(sequence_number: i64, reason: impl Into<String>) -> Self {
        Self::Integrity {
            sequence_number,
            reason: reason.into(),
        }
    }

    /// Validation failures, including oversize uploads, are the caller's fault
    /// and are never retried.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::PayloadTooLarge { .. })
    }
}

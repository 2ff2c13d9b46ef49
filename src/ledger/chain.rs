//! Chain Verification
//!
//! Recomputes every anchor digest and checks the links between them.

use serde::Serialize;
use tracing::{error, info};

use crate::error::{LedgerError, Result};
use crate::ledger::anchor::{Anchor, GENESIS_SEQUENCE};

/// Outcome of a successful chain verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub length: usize,
    pub head_digest: Option<String>,
}

/// Verify a full chain given in ascending sequence order.
///
/// Returns the first broken link as [`LedgerError::Integrity`].
pub fn verify_chain(anchors: &[Anchor]) -> Result<ChainReport> {
    let mut prev_digest: Option<String> = None;

    for (i, anchor) in anchors.iter().enumerate() {
        let expected_sequence = GENESIS_SEQUENCE + i as i64;
        if anchor.sequence_number != expected_sequence {
            return Err(report(LedgerError::integrity(
                expected_sequence,
                format!(
                    "expected sequence {}, found {}",
                    expected_sequence, anchor.sequence_number
                ),
            )));
        }

        let recomputed = anchor.calculate_digest();
        if recomputed != anchor.anchor_digest {
            return Err(report(LedgerError::integrity(
                anchor.sequence_number,
                format!(
                    "anchor digest mismatch: stored {}, recomputed {}",
                    anchor.anchor_digest, recomputed
                ),
            )));
        }

        if anchor.prev_anchor_digest != prev_digest {
            return Err(report(LedgerError::integrity(
                anchor.sequence_number,
                format!(
                    "previous digest mismatch: expected {}, found {}",
                    prev_digest.as_deref().unwrap_or("<genesis>"),
                    anchor.prev_anchor_digest.as_deref().unwrap_or("<genesis>")
                ),
            )));
        }

        prev_digest = Some(recomputed);
    }

    info!("Anchor chain verified: {} anchors", anchors.len());
    Ok(ChainReport {
        length: anchors.len(),
        head_digest: prev_digest,
    })
}

/// Sequence numbers of anchors whose stored digest no longer matches their
/// fields. Unlike [`verify_chain`] this keeps going past the first failure.
pub fn find_tampered_anchors(anchors: &[Anchor]) -> Vec<i64> {
    anchors
        .iter()
        .filter(|anchor| !anchor.verify_digest())
        .map(|anchor| anchor.sequence_number)
        .collect()
}

fn report(err: LedgerError) -> LedgerError {
    error!("{}", err);
    err
}

//! Anchored Submission Ledger
//!
//! Tamper-evident custody of submitted content: every submission is committed
//! by an anchor, and every anchor commits to the one before it.

pub mod anchor;
pub mod chain;
pub mod service;

pub use anchor::Anchor;
pub use chain::{find_tampered_anchors, verify_chain, ChainReport};
pub use service::{generate_submission_id, LedgerService, Upload, VerificationResult, Verdict};

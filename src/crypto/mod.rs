//! Cryptographic primitives for the ledger

pub mod fingerprint;

pub use fingerprint::{
    fingerprint_async_reader, fingerprint_bytes, fingerprint_reader, fingerprint_seekable,
    is_valid_digest, Fingerprinter,
};

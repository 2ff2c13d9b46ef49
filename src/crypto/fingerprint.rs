//! Content Fingerprinting
//!
//! SHA-256 fingerprints of submitted content. Submission and verification go
//! through the same functions here so identical bytes always produce the
//! identical digest.
//!
//! Two stream contracts are supported:
//! - [`fingerprint_reader`] consumes a plain reader from its current position
//!   to EOF. The stream is spent afterwards; keep a copy if the bytes are
//!   still needed.
//! - [`fingerprint_seekable`] hashes a seekable stream from offset 0 to EOF
//!   and puts the read position back where it found it.

use sha2::{Digest, Sha256};
use std::io::{self, Read, Seek, SeekFrom};
use tokio::io::AsyncRead;

/// Read size used by every streaming entry point.
pub const CHUNK_SIZE: usize = 8192;

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Incremental SHA-256 hasher over content chunks
#[derive(Clone, Default)]
pub struct Fingerprinter {
    hasher: Sha256,
    bytes_hashed: u64,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes_hashed += chunk.len() as u64;
    }

    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    /// Consume the hasher and return the lowercase hex digest
    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Fingerprint an in-memory buffer
pub fn fingerprint_bytes(content: &[u8]) -> String {
    let mut fingerprinter = Fingerprinter::new();
    for chunk in content.chunks(CHUNK_SIZE) {
        fingerprinter.update(chunk);
    }
    fingerprinter.finalize()
}

/// Fingerprint a non-seekable stream. Reads from the current position to EOF.
pub fn fingerprint_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut fingerprinter = Fingerprinter::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        fingerprinter.update(&buf[..n]);
    }
    Ok(fingerprinter.finalize())
}

/// Fingerprint a seekable stream in full, leaving its position unchanged.
pub fn fingerprint_seekable<R: Read + Seek>(reader: &mut R) -> io::Result<String> {
    let start = reader.stream_position()?;
    reader.seek(SeekFrom::Start(0))?;
    let digest = fingerprint_reader(reader);
    // Restore even when hashing failed part way.
    reader.seek(SeekFrom::Start(start))?;
    digest
}

/// Async counterpart of [`fingerprint_reader`]; consumes the reader.
pub async fn fingerprint_async_reader<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<String> {
    use tokio::io::AsyncReadExt;

    let mut fingerprinter = Fingerprinter::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        fingerprinter.update(&buf[..n]);
    }
    Ok(fingerprinter.finalize())
}

/// Check that a string looks like a digest produced by this module
pub fn is_valid_digest(digest: &str) -> bool {
    digest.len() == DIGEST_HEX_LEN
        && digest
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

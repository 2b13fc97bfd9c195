//! Integrity verification of downloaded files.
//!
//! Verification only reads: it never deletes, renames or re-fetches a file.
//! What to do about a mismatch is the caller's decision.

use crate::catalog::digest::{Digest, DigestAlgorithm};
use crate::download::{AssetState, DownloadResult};
use camino::Utf8Path;
use sha1::Sha1;
use sha2::Sha256;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};

/// Compute the lowercase hex digest of the file at `path`.
///
/// The file is streamed through the hasher in fixed-size chunks.
///
/// # Errors
///
/// Returns any I/O error raised while opening or reading the file.
pub fn compute_digest(path: &Utf8Path, algorithm: DigestAlgorithm) -> io::Result<String> {
    let file = fs::File::open(path)?;
    match algorithm {
        DigestAlgorithm::Sha1 => hash_reader::<Sha1>(file),
        DigestAlgorithm::Sha256 => hash_reader::<Sha256>(file),
    }
}

fn hash_reader<D: sha2::Digest>(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    let digest = hasher.finalize();
    Ok(digest
        .iter()
        .fold(String::with_capacity(digest.len() * 2), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        }))
}

/// Compares downloaded files with their manifest digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Create a verifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Verify a transferred file against `expected`.
    ///
    /// The result moves to [`AssetState::Verified`] when the recomputed hex
    /// digest equals `expected` ignoring case, and to
    /// [`AssetState::Mismatched`] otherwise. A file that cannot be read
    /// counts as a mismatch with no actual digest.
    #[must_use]
    pub fn verify(&self, result: DownloadResult, expected: &Digest) -> DownloadResult {
        match compute_digest(result.local_path(), expected.algorithm()) {
            Ok(actual) if expected.matches_hex(&actual) => {
                log::debug!("{} verified", result.file_name());
                result.finish(AssetState::Verified, Some(actual))
            }
            Ok(actual) => {
                log::warn!(
                    "{} digest mismatch: expected {}, got {actual}",
                    result.file_name(),
                    expected.as_str()
                );
                result.finish(AssetState::Mismatched, Some(actual))
            }
            Err(err) => {
                log::warn!("{} could not be read for verification: {err}", result.file_name());
                result.finish(AssetState::Mismatched, None)
            }
        }
    }
}

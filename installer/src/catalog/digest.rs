//! Digest algorithm selection and the validated hex digest newtype.
//!
//! The archive publishes SHA-1 digests. The algorithm is an explicit
//! configuration value; it is never inferred from the length of a
//! manifest digest.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Digest algorithm used by a manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-1, the algorithm the mainline archive publishes.
    #[default]
    Sha1,
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Return the length of this algorithm's hex-encoded output.
    ///
    /// # Examples
    ///
    /// ```
    /// use upkern_installer::catalog::digest::DigestAlgorithm;
    ///
    /// assert_eq!(DigestAlgorithm::Sha1.hex_len(), 40);
    /// assert_eq!(DigestAlgorithm::Sha256.hex_len(), 64);
    /// ```
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha1 => 40,
            Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Errors arising from an invalid digest string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    /// The digest has the wrong length for its algorithm.
    #[error("invalid {algorithm} digest: expected {expected} hex characters, got {actual}")]
    Length {
        /// The algorithm the digest was checked against.
        algorithm: DigestAlgorithm,
        /// Required number of hex characters.
        expected: usize,
        /// Number of characters supplied.
        actual: usize,
    },

    /// The digest contains a non-hex character.
    #[error("invalid {algorithm} digest: non-hex character '{bad}'")]
    NonHex {
        /// The algorithm the digest was checked against.
        algorithm: DigestAlgorithm,
        /// The first offending character.
        bad: char,
    },
}

/// A hex-encoded digest validated against its algorithm's output length.
///
/// Stored in lowercase; comparisons with other hex strings ignore case.
///
/// # Examples
///
/// ```
/// use upkern_installer::catalog::digest::{Digest, DigestAlgorithm};
///
/// let digest = Digest::parse(DigestAlgorithm::Sha1, &"AB".repeat(20)).expect("valid digest");
/// assert!(digest.matches_hex(&"ab".repeat(20)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Digest {
    algorithm: DigestAlgorithm,
    hex: String,
}

impl Digest {
    /// Validate `hex` as a digest produced by `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] when the length or alphabet is wrong.
    pub fn parse(algorithm: DigestAlgorithm, hex: &str) -> Result<Self, DigestError> {
        let expected = algorithm.hex_len();
        if hex.len() != expected {
            return Err(DigestError::Length {
                algorithm,
                expected,
                actual: hex.chars().count(),
            });
        }
        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(DigestError::NonHex { algorithm, bad });
        }
        Ok(Self {
            algorithm,
            hex: hex.to_ascii_lowercase(),
        })
    }

    /// Return the algorithm that produced this digest.
    #[must_use]
    pub const fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Return the lowercase hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// Compare against another hex string, ignoring case.
    #[must_use]
    pub fn matches_hex(&self, other: &str) -> bool {
        self.hex.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}

//! Manifest line parsing into checksum entries.
//!
//! A well-formed line is `<digest> <file name>` separated by any run of
//! whitespace. `sha1sum` binary-mode markers (`*name`) are tolerated.
//! Comment and blank lines carry no entry and are not counted as damage.

use super::digest::{Digest, DigestAlgorithm, DigestError};
use serde::Serialize;
use std::fmt;

/// One manifest line: a file in the build directory and its expected digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChecksumEntry {
    file_name: String,
    digest: Digest,
}

impl ChecksumEntry {
    /// Return the file name relative to the build directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Return the expected digest.
    #[must_use]
    pub const fn digest(&self) -> &Digest {
        &self.digest
    }
}

/// Why a manifest line was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// The line did not split into exactly a digest and a file name.
    FieldCount(usize),
    /// The digest field was invalid for the configured algorithm.
    Digest(DigestError),
    /// The file name would escape the build directory.
    UnsafeFileName(String),
    /// The file name already appeared earlier in the manifest.
    DuplicateFileName(String),
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount(count) => write!(f, "expected 2 fields, found {count}"),
            Self::Digest(err) => write!(f, "{err}"),
            Self::UnsafeFileName(name) => write!(f, "unsafe file name \"{name}\""),
            Self::DuplicateFileName(name) => write!(f, "duplicate file name \"{name}\""),
        }
    }
}

/// A non-fatal problem with one manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// One-based line number in the manifest.
    pub line_number: usize,
    /// Why the line was skipped.
    pub reason: MalformedReason,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.reason)
    }
}

/// What a single manifest line contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A valid entry for the configured algorithm.
    Entry(ChecksumEntry),
    /// A blank line or comment (for example a `# Checksums-Sha1:` header).
    Ignored,
    /// A valid hex digest whose length belongs to a different algorithm.
    ///
    /// Archives that publish several digest sections list each file once
    /// per algorithm; the other sections are neither used nor damage.
    OtherAlgorithm,
    /// A line that could not be parsed.
    Malformed(ParseWarning),
}

/// Parse one manifest line.
///
/// # Examples
///
/// ```
/// use upkern_installer::catalog::checksum::{LineOutcome, parse_line};
/// use upkern_installer::catalog::digest::DigestAlgorithm;
///
/// let line = format!("{}  linux-image.deb", "a".repeat(40));
/// let outcome = parse_line(&line, 1, DigestAlgorithm::Sha1);
/// assert!(matches!(outcome, LineOutcome::Entry(_)));
/// ```
#[must_use]
pub fn parse_line(line: &str, line_number: usize, algorithm: DigestAlgorithm) -> LineOutcome {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return LineOutcome::Ignored;
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let &[digest_hex, raw_name] = fields.as_slice() else {
        return malformed(line_number, MalformedReason::FieldCount(fields.len()));
    };

    let digest = match Digest::parse(algorithm, digest_hex) {
        Ok(digest) => digest,
        Err(err) if is_other_algorithm(algorithm, digest_hex) => {
            log::trace!("line {line_number}: skipping digest for another algorithm ({err})");
            return LineOutcome::OtherAlgorithm;
        }
        Err(err) => return malformed(line_number, MalformedReason::Digest(err)),
    };

    let file_name = raw_name.strip_prefix('*').unwrap_or(raw_name);
    if !is_safe_file_name(file_name) {
        return malformed(
            line_number,
            MalformedReason::UnsafeFileName(file_name.to_owned()),
        );
    }

    LineOutcome::Entry(ChecksumEntry {
        file_name: file_name.to_owned(),
        digest,
    })
}

fn malformed(line_number: usize, reason: MalformedReason) -> LineOutcome {
    LineOutcome::Malformed(ParseWarning {
        line_number,
        reason,
    })
}

fn is_other_algorithm(configured: DigestAlgorithm, hex: &str) -> bool {
    [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256]
        .into_iter()
        .filter(|candidate| *candidate != configured)
        .any(|candidate| Digest::parse(candidate, hex).is_ok())
}

fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SHA1: &str = "0123456789abcdef0123456789abcdef01234567";

    fn entry(line: &str) -> ChecksumEntry {
        match parse_line(line, 1, DigestAlgorithm::Sha1) {
            LineOutcome::Entry(entry) => entry,
            other => panic!("expected entry, got {other:?}"),
        }
    }

    #[rstest]
    #[case::two_spaces(format!("{SHA1}  linux-image.deb"))]
    #[case::tab(format!("{SHA1}\tlinux-image.deb"))]
    #[case::mixed(format!("  {SHA1} \t  linux-image.deb  "))]
    #[case::binary_marker(format!("{SHA1} *linux-image.deb"))]
    fn tolerates_interior_whitespace(#[case] line: String) {
        let parsed = entry(&line);
        assert_eq!(parsed.file_name(), "linux-image.deb");
        assert_eq!(parsed.digest().as_str(), SHA1);
    }

    #[rstest]
    #[case::blank("")]
    #[case::spaces("   ")]
    #[case::section_header("# Checksums-Sha1:")]
    fn ignores_blank_and_comment_lines(#[case] line: &str) {
        assert_eq!(parse_line(line, 3, DigestAlgorithm::Sha1), LineOutcome::Ignored);
    }

    #[test]
    fn sha256_line_is_other_algorithm_under_sha1() {
        let line = format!("{}  linux-image.deb", "b".repeat(64));
        assert_eq!(
            parse_line(&line, 1, DigestAlgorithm::Sha1),
            LineOutcome::OtherAlgorithm
        );
    }

    #[rstest]
    #[case::digest_only(SHA1.to_owned())]
    #[case::three_fields(format!("{SHA1} a.deb b.deb"))]
    #[case::short_digest("abc123 linux-image.deb".to_owned())]
    #[case::non_hex(format!("{}g linux-image.deb", &SHA1[..39]))]
    #[case::traversal(format!("{SHA1} ../etc/passwd"))]
    fn reports_malformed_lines(#[case] line: String) {
        let outcome = parse_line(&line, 7, DigestAlgorithm::Sha1);
        match outcome {
            LineOutcome::Malformed(warning) => assert_eq!(warning.line_number, 7),
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn warning_display_names_the_line() {
        let LineOutcome::Malformed(warning) = parse_line("garbage", 12, DigestAlgorithm::Sha1)
        else {
            panic!("expected malformed line");
        };
        assert!(warning.to_string().starts_with("line 12:"));
    }
}

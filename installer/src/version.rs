//! Kernel version newtype with upstream release ordering.
//!
//! Versions compare numerically segment by segment and a release candidate
//! sorts before the final release of the same numbers (`4.9.6-rc1 < 4.9.6`).
//! A missing patch level orders like zero, but `5.0` and `5.0.0` stay
//! distinct versions because the archive publishes them under different
//! directories. Segments never carry leading zeros, so the canonical form is
//! exactly what was parsed.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors arising from parsing a kernel version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    /// The input was empty or whitespace.
    #[error("kernel version is empty")]
    Empty,

    /// A numeric segment could not be parsed or has a leading zero.
    #[error("invalid kernel version \"{value}\": segment \"{segment}\" is not a number")]
    InvalidSegment {
        /// The rejected version string.
        value: String,
        /// The offending segment.
        segment: String,
    },

    /// The version has fewer than two or more than three numeric segments.
    #[error("invalid kernel version \"{value}\": expected major.minor[.patch][-rcN]")]
    SegmentCount {
        /// The rejected version string.
        value: String,
    },

    /// The release-candidate suffix is malformed.
    #[error("invalid kernel version \"{value}\": bad release candidate suffix")]
    InvalidCandidate {
        /// The rejected version string.
        value: String,
    },
}

/// An upstream kernel version such as `4.9.6`, `5.0` or `6.1-rc3`.
///
/// # Examples
///
/// ```
/// use upkern_installer::version::KernelVersion;
///
/// let final_release: KernelVersion = "4.9.6".parse().expect("valid version");
/// let candidate: KernelVersion = "4.9.6-rc1".parse().expect("valid version");
/// assert!(candidate < final_release);
/// assert_eq!(final_release.directory_name(), "v4.9.6");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelVersion {
    major: u32,
    minor: u32,
    patch: Option<u32>,
    rc: Option<u32>,
}

impl KernelVersion {
    /// Return the major version number.
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Return the minor version number.
    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// Return the patch level, if the version carries one.
    #[must_use]
    pub const fn patch(&self) -> Option<u32> {
        self.patch
    }

    /// Return the release-candidate number, if this is a candidate.
    #[must_use]
    pub const fn release_candidate(&self) -> Option<u32> {
        self.rc
    }

    /// Return whether this version is a release candidate.
    #[must_use]
    pub const fn is_release_candidate(&self) -> bool {
        self.rc.is_some()
    }

    /// Return the archive directory name for this version (`v` + canonical form).
    #[must_use]
    pub fn directory_name(&self) -> String {
        format!("v{self}")
    }

    fn sort_key(&self) -> (u32, u32, u32, u8, u32) {
        let (final_rank, rc) = match self.rc {
            Some(n) => (0, n),
            None => (1, 0),
        };
        (
            self.major,
            self.minor,
            self.patch.unwrap_or(0),
            final_rank,
            rc,
        )
    }
}

impl PartialOrd for KernelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KernelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.patch.is_some().cmp(&other.patch.is_some()))
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        }
        if let Some(rc) = self.rc {
            write!(f, "-rc{rc}")?;
        }
        Ok(())
    }
}

impl serde::Serialize for KernelVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for KernelVersion {
    type Err = VersionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let (numbers, rc) = split_candidate(value, trimmed)?;
        let segments = numbers
            .split('.')
            .map(|segment| parse_segment(value, segment))
            .collect::<Result<Vec<_>, _>>()?;

        match segments.as_slice() {
            [major, minor] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: None,
                rc,
            }),
            [major, minor, patch] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: Some(*patch),
                rc,
            }),
            _ => Err(VersionParseError::SegmentCount {
                value: value.to_owned(),
            }),
        }
    }
}

fn split_candidate<'a>(
    original: &str,
    trimmed: &'a str,
) -> Result<(&'a str, Option<u32>), VersionParseError> {
    let Some((numbers, suffix)) = trimmed.split_once("-rc") else {
        return Ok((trimmed, None));
    };
    let has_leading_zero = suffix.len() > 1 && suffix.starts_with('0');
    if suffix.is_empty() || has_leading_zero || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return Err(VersionParseError::InvalidCandidate {
            value: original.to_owned(),
        });
    }
    let rc = suffix
        .parse()
        .map_err(|_| VersionParseError::InvalidCandidate {
            value: original.to_owned(),
        })?;
    Ok((numbers, Some(rc)))
}

fn parse_segment(original: &str, segment: &str) -> Result<u32, VersionParseError> {
    // `u32::from_str` accepts a leading `+`, which is not a version digit.
    let has_leading_zero = segment.len() > 1 && segment.starts_with('0');
    if segment.is_empty() || has_leading_zero || !segment.chars().all(|c| c.is_ascii_digit()) {
        return Err(VersionParseError::InvalidSegment {
            value: original.to_owned(),
            segment: segment.to_owned(),
        });
    }
    segment
        .parse()
        .map_err(|_| VersionParseError::InvalidSegment {
            value: original.to_owned(),
            segment: segment.to_owned(),
        })
}

//! Latest-stable version resolution from the release metadata source.
//!
//! The metadata document is the `releases.json` published by kernel.org.
//! Only the `latest_stable.version` field is consumed; everything else in
//! the document is ignored.

use super::http::{ArchiveClient, FetchError};
use crate::version::{KernelVersion, VersionParseError};
use serde::Deserialize;

/// Default release metadata endpoint.
pub const DEFAULT_RELEASE_METADATA_URL: &str = "https://www.kernel.org/releases.json";

/// Errors that prevent determining which version to fetch.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// The metadata source could not be reached.
    #[error("release metadata unreachable: {0}")]
    Unreachable(#[from] FetchError),

    /// The payload is not the JSON document we expect.
    #[error("malformed release metadata from {url}: {reason}")]
    Malformed {
        /// The metadata URL.
        url: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// The payload has no latest stable version.
    #[error("release metadata from {url} has no latest_stable.version field")]
    MissingField {
        /// The metadata URL.
        url: String,
    },

    /// A version string (published or operator-forced) is invalid.
    #[error(transparent)]
    InvalidVersion(#[from] VersionParseError),
}

#[derive(Debug, Deserialize)]
struct ReleaseMetadata {
    latest_stable: Option<LatestStable>,
}

#[derive(Debug, Deserialize)]
struct LatestStable {
    version: Option<String>,
}

/// Resolves the version to fetch: an operator-forced one or the latest stable.
pub struct VersionResolver<'a> {
    client: &'a dyn ArchiveClient,
    metadata_url: String,
    forced_version: Option<String>,
}

impl<'a> VersionResolver<'a> {
    /// Create a resolver reading `metadata_url` through `client`.
    #[must_use]
    pub fn new(client: &'a dyn ArchiveClient, metadata_url: impl Into<String>) -> Self {
        Self {
            client,
            metadata_url: metadata_url.into(),
            forced_version: None,
        }
    }

    /// Use `version` verbatim instead of asking the metadata source.
    #[must_use]
    pub fn with_forced_version(mut self, version: Option<String>) -> Self {
        self.forced_version = version;
        self
    }

    /// Resolve the version to fetch.
    ///
    /// A forced version is format-checked only; whether the archive has a
    /// build for it is left to the manifest fetch.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] when the metadata source is unreachable,
    /// the payload is malformed or lacks the field, or a version is invalid.
    pub fn resolve_latest_stable(&self) -> Result<KernelVersion, ResolutionError> {
        if let Some(forced) = &self.forced_version {
            log::debug!("using forced kernel version {forced}");
            return Ok(forced.parse()?);
        }

        let body = self.client.fetch_text(&self.metadata_url)?;
        let version = parse_latest_stable(&self.metadata_url, &body)?;
        log::debug!("latest stable kernel version is {version}");
        Ok(version)
    }
}

/// Extract the latest stable version from a `releases.json` payload.
///
/// # Errors
///
/// Returns [`ResolutionError::Malformed`], [`ResolutionError::MissingField`]
/// or [`ResolutionError::InvalidVersion`].
///
/// # Examples
///
/// ```
/// use upkern_installer::archive::releases::parse_latest_stable;
///
/// let json = r#"{"latest_stable":{"version":"4.9.6"},"releases":[]}"#;
/// let version = parse_latest_stable("https://example.test/releases.json", json)
///     .expect("valid metadata");
/// assert_eq!(version.to_string(), "4.9.6");
/// ```
pub fn parse_latest_stable(url: &str, body: &str) -> Result<KernelVersion, ResolutionError> {
    let metadata: ReleaseMetadata =
        serde_json::from_str(body).map_err(|e| ResolutionError::Malformed {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
    let version = metadata
        .latest_stable
        .and_then(|latest| latest.version)
        .ok_or_else(|| ResolutionError::MissingField {
            url: url.to_owned(),
        })?;
    Ok(version.parse()?)
}

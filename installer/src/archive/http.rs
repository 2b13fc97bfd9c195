//! HTTP access to the release metadata source and the package archive.
//!
//! Provides a trait-based abstraction over text fetches so that the
//! resolver and manifest fetcher can be exercised without network access.

use std::sync::OnceLock;
use std::time::Duration;

/// Network timeout for metadata, listing and manifest fetches.
const TEXT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for fetching small text documents over HTTP.
///
/// # Examples
///
/// ```no_run
/// use upkern_installer::archive::http::{ArchiveClient, UreqClient};
///
/// let client = UreqClient;
/// let body = client.fetch_text("https://www.kernel.org/releases.json")?;
/// assert!(body.contains("latest_stable"));
/// # Ok::<(), upkern_installer::archive::http::FetchError>(())
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveClient {
    /// Fetch `url` and return the response body as text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] for HTTP 404 and
    /// [`FetchError::HttpError`] for any other transport or status failure.
    fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Errors arising from HTTP fetches.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("fetch failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested document was not found (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error while reading or writing a body.
    #[error("I/O error during fetch: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP client backed by `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqClient;

impl ArchiveClient for UreqClient {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        log::debug!("fetching {url}");
        let response = text_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| FetchError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }
}

/// Shared `ureq` agent for text fetches, with a global timeout.
fn text_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(TEXT_FETCH_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`FetchError`].
pub(crate) fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(404) => FetchError::NotFound {
            url: url.to_owned(),
        },
        other => FetchError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

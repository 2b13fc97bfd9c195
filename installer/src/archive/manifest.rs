//! Checksum manifest retrieval from a version's build directory.

use super::http::{ArchiveClient, FetchError};
use super::layout::{ArchiveLayout, MANIFEST_FILE_NAME};
use crate::version::KernelVersion;

/// Errors raised while locating and fetching a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The archive has no build directory for the version.
    #[error("no build directory for kernel {version} at {url}")]
    DirectoryNotFound {
        /// The version that was looked up.
        version: KernelVersion,
        /// The directory URL that returned 404.
        url: String,
    },

    /// The build directory exists but does not list a manifest.
    #[error("build directory {url} has no {MANIFEST_FILE_NAME} file")]
    ManifestMissing {
        /// The directory URL.
        url: String,
    },

    /// A transport failure other than a missing directory.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ManifestError {
    /// Return whether retrying with a different version could help.
    #[must_use]
    pub const fn is_missing_build(&self) -> bool {
        matches!(
            self,
            Self::DirectoryNotFound { .. } | Self::ManifestMissing { .. }
        )
    }
}

/// Fetches the raw checksum manifest for a version.
pub struct ManifestFetcher<'a> {
    client: &'a dyn ArchiveClient,
    layout: ArchiveLayout,
}

impl<'a> ManifestFetcher<'a> {
    /// Create a fetcher reading from `layout` through `client`.
    #[must_use]
    pub fn new(client: &'a dyn ArchiveClient, layout: ArchiveLayout) -> Self {
        Self { client, layout }
    }

    /// Fetch the manifest text for `version`.
    ///
    /// The directory listing is fetched first so that a missing build is
    /// told apart from a transport failure.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::DirectoryNotFound`] when the build directory
    /// is absent, [`ManifestError::ManifestMissing`] when it holds no
    /// manifest, and [`ManifestError::Fetch`] for other failures.
    pub fn fetch_manifest(&self, version: &KernelVersion) -> Result<String, ManifestError> {
        let directory_url = self.layout.directory_url(version);
        let listing = match self.client.fetch_text(&directory_url) {
            Ok(listing) => listing,
            Err(FetchError::NotFound { url }) => {
                return Err(ManifestError::DirectoryNotFound {
                    version: *version,
                    url,
                });
            }
            Err(other) => return Err(other.into()),
        };

        if !listing_mentions(&listing, MANIFEST_FILE_NAME) {
            return Err(ManifestError::ManifestMissing { url: directory_url });
        }

        let manifest_url = self.layout.manifest_url(version);
        log::debug!("fetching manifest {manifest_url}");
        match self.client.fetch_text(&manifest_url) {
            Ok(text) => Ok(text),
            Err(FetchError::NotFound { .. }) => {
                Err(ManifestError::ManifestMissing { url: directory_url })
            }
            Err(other) => Err(other.into()),
        }
    }
}

/// Return whether an HTML directory listing links to `file_name`.
fn listing_mentions(listing: &str, file_name: &str) -> bool {
    [
        format!("href=\"{file_name}\""),
        format!("href='{file_name}'"),
        format!(">{file_name}<"),
    ]
    .iter()
    .any(|needle| listing.contains(needle.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::http::MockArchiveClient;
    use rstest::rstest;

    const BASE: &str = "https://archive.test/mainline";
    const LISTING: &str = r#"<html><body><a href="CHECKSUMS">CHECKSUMS</a></body></html>"#;

    fn version() -> KernelVersion {
        "4.9.6".parse().expect("valid version")
    }

    fn fetcher(client: &MockArchiveClient) -> ManifestFetcher<'_> {
        ManifestFetcher::new(client, ArchiveLayout::new(BASE))
    }

    #[test]
    fn returns_manifest_text() {
        let mut client = MockArchiveClient::new();
        client
            .expect_fetch_text()
            .withf(|url| url == "https://archive.test/mainline/v4.9.6/")
            .times(1)
            .returning(|_| Ok(LISTING.to_owned()));
        client
            .expect_fetch_text()
            .withf(|url| url == "https://archive.test/mainline/v4.9.6/CHECKSUMS")
            .times(1)
            .returning(|_| Ok("abc  file.deb\n".to_owned()));

        let text = fetcher(&client)
            .fetch_manifest(&version())
            .expect("manifest");
        assert_eq!(text, "abc  file.deb\n");
    }

    #[test]
    fn missing_directory_is_distinct_from_transport_failure() {
        let mut client = MockArchiveClient::new();
        client.expect_fetch_text().returning(|url| {
            Err(FetchError::NotFound {
                url: url.to_owned(),
            })
        });

        let err = fetcher(&client)
            .fetch_manifest(&version())
            .expect_err("missing directory");
        assert!(matches!(err, ManifestError::DirectoryNotFound { .. }));
        assert!(err.is_missing_build());
    }

    #[test]
    fn transport_failure_is_a_fetch_error() {
        let mut client = MockArchiveClient::new();
        client.expect_fetch_text().returning(|url| {
            Err(FetchError::HttpError {
                url: url.to_owned(),
                reason: "timed out".to_owned(),
            })
        });

        let err = fetcher(&client)
            .fetch_manifest(&version())
            .expect_err("transport failure");
        assert!(matches!(err, ManifestError::Fetch(_)));
        assert!(!err.is_missing_build());
    }

    #[test]
    fn listing_without_manifest_is_reported() {
        let mut client = MockArchiveClient::new();
        client
            .expect_fetch_text()
            .times(1)
            .returning(|_| Ok("<a href=\"BUILD.LOG\">BUILD.LOG</a>".to_owned()));

        let err = fetcher(&client)
            .fetch_manifest(&version())
            .expect_err("no manifest");
        assert!(matches!(err, ManifestError::ManifestMissing { .. }));
    }

    #[rstest]
    #[case::double_quoted(r#"<a href="CHECKSUMS">x</a>"#, true)]
    #[case::single_quoted("<a href='CHECKSUMS'>x</a>", true)]
    #[case::link_text("<a href=\"./CHECKSUMS\">CHECKSUMS</a>", true)]
    #[case::other_file(r#"<a href="CHECKSUMS.gpg">CHECKSUMS.gpg</a>"#, false)]
    fn listing_detection(#[case] listing: &str, #[case] expected: bool) {
        assert_eq!(listing_mentions(listing, MANIFEST_FILE_NAME), expected);
    }
}

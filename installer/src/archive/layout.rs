//! URL layout of the mainline package archive.
//!
//! Each version has a build directory named after its canonical form with a
//! `v` prefix, holding the package files and a `CHECKSUMS` manifest.

use crate::version::KernelVersion;

/// Default root of the mainline package archive.
pub const DEFAULT_ARCHIVE_URL: &str = "https://kernel.ubuntu.com/~kernel-ppa/mainline";

/// File name of the per-version checksum manifest.
pub const MANIFEST_FILE_NAME: &str = "CHECKSUMS";

/// Builds archive URLs for build directories and the files inside them.
///
/// # Examples
///
/// ```
/// use upkern_installer::archive::layout::ArchiveLayout;
/// use upkern_installer::version::KernelVersion;
///
/// let layout = ArchiveLayout::new("https://archive.example/mainline/");
/// let version: KernelVersion = "4.9.6".parse().expect("valid version");
/// assert_eq!(
///     layout.manifest_url(&version),
///     "https://archive.example/mainline/v4.9.6/CHECKSUMS"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    base_url: String,
}

impl ArchiveLayout {
    /// Create a layout rooted at `base_url`; trailing slashes are ignored.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Return the archive root.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Return the build directory URL for `version`, with a trailing slash.
    #[must_use]
    pub fn directory_url(&self, version: &KernelVersion) -> String {
        format!("{}/{}/", self.base_url, version.directory_name())
    }

    /// Return the manifest URL for `version`.
    #[must_use]
    pub fn manifest_url(&self, version: &KernelVersion) -> String {
        self.file_url(version, MANIFEST_FILE_NAME)
    }

    /// Return the URL of `file_name` inside the build directory for `version`.
    #[must_use]
    pub fn file_url(&self, version: &KernelVersion, file_name: &str) -> String {
        format!("{}{file_name}", self.directory_url(version))
    }
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_URL)
    }
}

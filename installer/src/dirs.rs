//! Directory resolution abstraction for platform-specific paths.
//!
//! [`BaseDirs`] lets configuration loading and destination defaults be
//! tested without touching the real home directory.

use camino::Utf8PathBuf;
use directories_next::{ProjectDirs, UserDirs};
use std::path::PathBuf;

/// Directory under the downloads folder that receives kernel packages.
pub const DOWNLOAD_SUBDIRECTORY: &str = "StableUpstreamKernels";

/// Platform directories the installer depends on.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Return the user's home directory.
    fn home_dir(&self) -> Option<PathBuf>;

    /// Return the user's downloads directory.
    fn download_dir(&self) -> Option<PathBuf>;

    /// Return the directory holding the installer's configuration file.
    fn config_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    user: Option<UserDirs>,
    project: Option<ProjectDirs>,
}

impl SystemBaseDirs {
    /// Resolve the platform directories.
    ///
    /// Hosts without a home directory yield `None` from every lookup.
    #[must_use]
    pub fn new() -> Self {
        Self {
            user: UserDirs::new(),
            project: ProjectDirs::from("", "", "upkern"),
        }
    }
}

impl Default for SystemBaseDirs {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        self.user.as_ref().map(|user| user.home_dir().to_path_buf())
    }

    fn download_dir(&self) -> Option<PathBuf> {
        self.user
            .as_ref()
            .and_then(UserDirs::download_dir)
            .map(|dir| dir.to_path_buf())
    }

    fn config_dir(&self) -> Option<PathBuf> {
        self.project
            .as_ref()
            .map(|project| project.config_dir().to_path_buf())
    }
}

/// Return the default destination root for downloaded packages.
///
/// Uses the platform downloads directory, falling back to `~/Downloads`.
/// Returns `None` when neither is known or the path is not UTF-8.
#[must_use]
pub fn default_destination_root(dirs: &dyn BaseDirs) -> Option<Utf8PathBuf> {
    let downloads = dirs
        .download_dir()
        .or_else(|| dirs.home_dir().map(|home| home.join("Downloads")))?;
    Utf8PathBuf::from_path_buf(downloads.join(DOWNLOAD_SUBDIRECTORY)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_the_platform_downloads_directory() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_download_dir()
            .return_once(|| Some(PathBuf::from("/home/kim/Fetched")));
        dirs.expect_home_dir().never();

        assert_eq!(
            default_destination_root(&dirs),
            Some(Utf8PathBuf::from("/home/kim/Fetched/StableUpstreamKernels"))
        );
    }

    #[test]
    fn falls_back_to_home_downloads() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_download_dir().return_once(|| None);
        dirs.expect_home_dir()
            .return_once(|| Some(PathBuf::from("/home/kim")));

        assert_eq!(
            default_destination_root(&dirs),
            Some(Utf8PathBuf::from("/home/kim/Downloads/StableUpstreamKernels"))
        );
    }

    #[test]
    fn no_home_means_no_default() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_download_dir().return_once(|| None);
        dirs.expect_home_dir().return_once(|| None);

        assert_eq!(default_destination_root(&dirs), None);
    }
}

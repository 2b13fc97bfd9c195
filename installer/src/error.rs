//! Error types for the upkern CLI.
//!
//! Only failures that leave nothing useful to offer the operator are errors
//! here. Per-package problems (failed transfers, digest mismatches) are
//! values collected in a [`crate::pipeline::RunReport`].

use crate::archive::manifest::ManifestError;
use crate::archive::releases::ResolutionError;
use crate::catalog::builder::GroupKey;
use crate::config::ConfigError;
use crate::install::InstallError;
use crate::version::KernelVersion;
use thiserror::Error;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The version to fetch could not be determined.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The manifest for the version could not be obtained.
    #[error("{source}{}", retry_hint(.source))]
    Manifest {
        /// The underlying manifest error.
        #[from]
        source: ManifestError,
    },

    /// The requested group is not in the catalog.
    #[error("kernel {version} has no {group} packages; available: {available}")]
    GroupNotFound {
        /// The version whose catalog was searched.
        version: KernelVersion,
        /// The requested group.
        group: GroupKey,
        /// Comma-separated groups that do exist.
        available: String,
    },

    /// The role filter removed every package of an existing group.
    #[error("kernel {version} has no {roles} packages for {group}")]
    EmptySelection {
        /// The version whose catalog was searched.
        version: KernelVersion,
        /// The requested group.
        group: GroupKey,
        /// Comma-separated roles that were requested.
        roles: String,
    },

    /// Installation of verified packages failed.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn retry_hint(source: &ManifestError) -> &'static str {
    if source.is_missing_build() {
        "; the build may not be published yet, retry later or pass --kernel-version"
    } else {
        ""
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;

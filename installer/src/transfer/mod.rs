//! File transfer strategies.
//!
//! A [`Transfer`] moves one remote file to one local path. Two strategies
//! exist: an external command-line tool ([`external::ExternalTransfer`]) and
//! a built-in streaming client ([`builtin::BuiltinTransfer`]). The strategy
//! is chosen once per run by [`select_transfer`] and shared by all workers.

pub mod builtin;
pub mod external;

use crate::archive::http::FetchError;
use crate::process::SystemCommandExecutor;
use camino::Utf8Path;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub use builtin::BuiltinTransfer;
pub use external::{ExternalTransfer, ToolKind};

/// Which mechanism produced a local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMechanism {
    /// An external tool such as `wget` or `curl`.
    ExternalTool(ToolKind),
    /// The built-in streaming client.
    Builtin,
    /// Nothing was transferred; the file was already on disk.
    AlreadyPresent,
}

impl fmt::Display for TransferMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExternalTool(tool) => write!(f, "{tool}"),
            Self::Builtin => f.write_str("builtin"),
            Self::AlreadyPresent => f.write_str("already-present"),
        }
    }
}

impl Serialize for TransferMechanism {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors raised by a single transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The external tool could not be started.
    #[error("failed to run {tool}: {source}")]
    Spawn {
        /// The tool that was invoked.
        tool: ToolKind,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The external tool exited unsuccessfully.
    #[error("{tool} exited unsuccessfully: {detail}")]
    ToolFailed {
        /// The tool that was invoked.
        tool: ToolKind,
        /// Captured stderr or the exit status.
        detail: String,
    },

    /// The built-in client failed.
    #[error(transparent)]
    Http(#[from] FetchError),

    /// A local I/O operation failed.
    #[error("I/O error during transfer: {0}")]
    Io(#[from] std::io::Error),
}

/// Strategy for moving one remote file to a local path.
///
/// Implementations overwrite `dest` and must be usable from several worker
/// threads at once.
#[cfg_attr(test, mockall::automock)]
pub trait Transfer: Send + Sync {
    /// Return the mechanism this strategy reports in results.
    fn mechanism(&self) -> TransferMechanism;

    /// Fetch `url` into `dest`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] when the file could not be fetched.
    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<u64, TransferError>;
}

/// How the transfer strategy should be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferPreference {
    /// Probe for external tools and fall back to the built-in client.
    #[default]
    Auto,
    /// Always use the built-in client.
    Builtin,
}

/// Locates executables on the host.
#[cfg_attr(test, mockall::automock)]
pub trait ToolLocator {
    /// Return the path of `program`, if installed.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Searches `PATH` with the `which` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathToolLocator;

impl ToolLocator for PathToolLocator {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Choose the transfer strategy for this run.
///
/// External tools are looked up in [`ToolKind::SEARCH_ORDER`]; the first one
/// found wins. Absence of every tool silently selects the built-in client.
#[must_use]
pub fn select_transfer(
    preference: TransferPreference,
    locator: &dyn ToolLocator,
) -> Arc<dyn Transfer> {
    if preference == TransferPreference::Auto {
        for tool in ToolKind::SEARCH_ORDER {
            if let Some(path) = locator.locate(tool.program()) {
                log::debug!("using {tool} at {}", path.display());
                return Arc::new(ExternalTransfer::new(tool, SystemCommandExecutor));
            }
        }
        log::debug!("no external transfer tool found; using built-in client");
    }
    Arc::new(BuiltinTransfer::new())
}

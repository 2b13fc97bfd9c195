//! Transfers through an external command-line downloader.

use super::{Transfer, TransferError, TransferMechanism};
use crate::process::{CommandExecutor, failure_detail};
use camino::Utf8Path;
use std::fmt;

/// Supported external downloaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// GNU Wget.
    Wget,
    /// curl.
    Curl,
}

impl ToolKind {
    /// Tools in the order they are looked up.
    pub const SEARCH_ORDER: [Self; 2] = [Self::Wget, Self::Curl];

    /// Return the executable name.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Wget => "wget",
            Self::Curl => "curl",
        }
    }

    /// Build the argument list that writes `url` to `dest`.
    ///
    /// Both tools are asked to fail on HTTP errors and to stay quiet.
    #[must_use]
    pub fn arguments<'a>(self, url: &'a str, dest: &'a str) -> Vec<&'a str> {
        match self {
            Self::Wget => vec!["-q", "-O", dest, url],
            Self::Curl => vec!["-fsSL", "-o", dest, url],
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Runs an external downloader once per file.
#[derive(Debug)]
pub struct ExternalTransfer<E> {
    tool: ToolKind,
    executor: E,
}

impl<E: CommandExecutor> ExternalTransfer<E> {
    /// Create a transfer running `tool` through `executor`.
    pub const fn new(tool: ToolKind, executor: E) -> Self {
        Self { tool, executor }
    }
}

impl<E: CommandExecutor> Transfer for ExternalTransfer<E> {
    fn mechanism(&self) -> TransferMechanism {
        TransferMechanism::ExternalTool(self.tool)
    }

    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<u64, TransferError> {
        let args = self.tool.arguments(url, dest.as_str());
        let output = self
            .executor
            .run(self.tool.program(), &args)
            .map_err(|source| TransferError::Spawn {
                tool: self.tool,
                source,
            })?;
        if !output.status.success() {
            return Err(TransferError::ToolFailed {
                tool: self.tool,
                detail: failure_detail(&output),
            });
        }
        Ok(std::fs::metadata(dest)?.len())
    }
}

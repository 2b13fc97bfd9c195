//! Shared test utilities for the installer crate.

use crate::archive::http::{ArchiveClient, FetchError};
use crate::process::CommandExecutor;
use crate::transfer::{Transfer, TransferError, TransferMechanism};
use camino::Utf8Path;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::process::{ExitStatus, Output};
use std::sync::{Mutex, PoisonError};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "dpkg").
    pub cmd: String,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: io::Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: Mutex<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: Mutex::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        let call = self
            .expected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .expect("unexpected command invocation");

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args, args);

        call.result
    }
}

/// Canned response served by [`StubArchive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubResponse {
    /// Respond with this body.
    Body(String),
    /// Respond with HTTP 404.
    NotFound,
    /// Fail at the transport level with this reason.
    Unreachable(String),
}

/// An `ArchiveClient` serving canned responses keyed by URL.
///
/// Unknown URLs answer [`StubResponse::NotFound`]. Every requested URL is
/// recorded so tests can assert on network use.
#[derive(Debug, Default)]
pub struct StubArchive {
    responses: HashMap<String, StubResponse>,
    requests: Mutex<Vec<String>>,
}

impl StubArchive {
    /// Creates an archive that knows no URLs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `response` for `url`.
    #[must_use]
    pub fn with(mut self, url: impl Into<String>, response: StubResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    /// Serves `body` for `url`.
    #[must_use]
    pub fn with_body(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with(url, StubResponse::Body(body.into()))
    }

    /// Returns every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ArchiveClient for StubArchive {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());
        match self.responses.get(url) {
            Some(StubResponse::Body(body)) => Ok(body.clone()),
            Some(StubResponse::Unreachable(reason)) => Err(FetchError::HttpError {
                url: url.to_owned(),
                reason: reason.clone(),
            }),
            Some(StubResponse::NotFound) | None => Err(FetchError::NotFound {
                url: url.to_owned(),
            }),
        }
    }
}

/// A `Transfer` writing canned bytes per file name.
///
/// The file name is the last path segment of the requested URL. Names with
/// no payload, or marked failing, produce a transfer error.
#[derive(Debug)]
pub struct StubTransfer {
    payloads: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl Default for StubTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl StubTransfer {
    /// Creates a stub reporting the built-in mechanism.
    pub fn new() -> Self {
        Self {
            payloads: HashMap::new(),
            failing: HashSet::new(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// Serves `bytes` for `file_name`.
    #[must_use]
    pub fn with_payload(mut self, file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.payloads.insert(file_name.into(), bytes.into());
        self
    }

    /// Fails every transfer of `file_name`.
    #[must_use]
    pub fn failing(mut self, file_name: impl Into<String>) -> Self {
        self.failing.insert(file_name.into());
        self
    }

    /// Returns the file names fetched so far, in completion order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transfer for StubTransfer {
    fn mechanism(&self) -> TransferMechanism {
        TransferMechanism::Builtin
    }

    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<u64, TransferError> {
        let file_name = url.rsplit('/').next().unwrap_or(url);
        self.fetched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file_name.to_owned());

        let payload = match self.payloads.get(file_name) {
            Some(payload) if !self.failing.contains(file_name) => payload,
            _ => {
                return Err(TransferError::Http(FetchError::NotFound {
                    url: url.to_owned(),
                }));
            }
        };
        std::fs::write(dest, payload)?;
        Ok(payload.len() as u64)
    }
}

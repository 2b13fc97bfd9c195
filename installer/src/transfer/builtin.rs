//! Built-in streaming transfer used when no external tool is installed.
//!
//! Bytes are streamed straight to disk. There is no resumption and no
//! overall deadline; only connection establishment is bounded.

use super::{Transfer, TransferError, TransferMechanism};
use crate::archive::http::{FetchError, map_ureq_error};
use camino::Utf8Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Bound on establishing a connection to the archive.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Streams files over HTTP with `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTransfer;

impl BuiltinTransfer {
    /// Create the built-in transfer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Transfer for BuiltinTransfer {
    fn mechanism(&self) -> TransferMechanism {
        TransferMechanism::Builtin
    }

    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<u64, TransferError> {
        log::debug!("streaming {url} to {dest}");
        let response = transfer_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;

        let mut file = std::fs::File::create(dest)?;
        let written = std::io::copy(&mut response.into_body().as_reader(), &mut file).map_err(
            |e| FetchError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            },
        )?;
        file.sync_all()?;
        Ok(written)
    }
}

/// Shared `ureq` agent for file transfers.
fn transfer_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

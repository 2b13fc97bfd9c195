//! Download engine: selected assets to verified files on disk.
//!
//! Files land at `<root>/<version>/<architecture>/<flavor>/<file name>`.
//! Each transfer writes into a temporary sibling that is renamed into place
//! only on success, so a failed transfer never leaves a file at the final
//! path. A non-empty file already at the final path is not fetched again,
//! but it is always re-verified.

use crate::archive::layout::ArchiveLayout;
use crate::catalog::builder::PackageAsset;
use crate::catalog::selection::Selection;
use crate::pool::run_bounded;
use crate::transfer::{Transfer, TransferError, TransferMechanism};
use crate::verify::IntegrityVerifier;
use crate::version::KernelVersion;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

/// Default number of concurrent transfers.
pub const DEFAULT_WORKERS: usize = 4;

/// Prefix of temporary files holding in-flight transfers.
const PARTIAL_PREFIX: &str = ".upkern-partial-";

/// Lifecycle of one selected asset.
///
/// `Pending -> Transferring -> Transferred -> Verified | Mismatched`, or
/// `Pending -> TransferFailed`. States never move backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetState {
    /// Selected, not yet started.
    Pending,
    /// Bytes are being written.
    Transferring,
    /// The file is complete on disk but unchecked.
    Transferred,
    /// The file matches its manifest digest.
    Verified,
    /// The file does not match its manifest digest.
    Mismatched,
    /// The transfer failed.
    TransferFailed,
}

impl AssetState {
    /// Return whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Verified | Self::Mismatched | Self::TransferFailed
        )
    }

    /// Return whether moving from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Transferring | Self::TransferFailed)
                | (Self::Transferring, Self::Transferred | Self::TransferFailed)
                | (Self::Transferred, Self::Verified | Self::Mismatched)
        )
    }
}

/// Outcome record for one asset that reached the disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    file_name: String,
    local_path: Utf8PathBuf,
    byte_count: u64,
    mechanism: TransferMechanism,
    state: AssetState,
    actual_digest: Option<String>,
}

impl DownloadResult {
    /// Record a file that is complete on disk and awaiting verification.
    #[must_use]
    pub fn transferred(
        file_name: impl Into<String>,
        local_path: Utf8PathBuf,
        byte_count: u64,
        mechanism: TransferMechanism,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            local_path,
            byte_count,
            mechanism,
            state: AssetState::Transferred,
            actual_digest: None,
        }
    }

    /// Move to a verification outcome.
    ///
    /// Only the transition out of [`AssetState::Transferred`] is applied; a
    /// result that is already final keeps its state.
    #[must_use]
    pub fn finish(mut self, state: AssetState, actual_digest: Option<String>) -> Self {
        if self.state.can_advance_to(state) {
            self.state = state;
            self.actual_digest = actual_digest;
        } else {
            log::warn!(
                "ignoring {:?} -> {state:?} for {}",
                self.state,
                self.file_name
            );
        }
        self
    }

    /// Return the file name within the build directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Return where the file lives on disk.
    #[must_use]
    pub fn local_path(&self) -> &Utf8Path {
        &self.local_path
    }

    /// Return the size of the file on disk.
    #[must_use]
    pub const fn byte_count(&self) -> u64 {
        self.byte_count
    }

    /// Return how the file got there.
    #[must_use]
    pub const fn mechanism(&self) -> TransferMechanism {
        self.mechanism
    }

    /// Return the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> AssetState {
        self.state
    }

    /// Return whether the file matched its manifest digest.
    #[must_use]
    pub fn verified_digest_match(&self) -> bool {
        self.state == AssetState::Verified
    }

    /// Return the digest recomputed during verification, if any.
    #[must_use]
    pub fn actual_digest(&self) -> Option<&str> {
        self.actual_digest.as_deref()
    }
}

/// A transfer that did not produce a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferFailure {
    /// The file that could not be fetched.
    pub file_name: String,
    /// The URL that was requested.
    pub url: String,
    /// What went wrong.
    pub reason: String,
}

/// Everything one engine run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadBatch {
    /// Files that reached the disk, in selection order, each verified.
    pub results: Vec<DownloadResult>,
    /// Transfers that failed, in selection order.
    pub failures: Vec<TransferFailure>,
}

/// Settings the engine is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Root of the destination layout.
    pub destination_root: Utf8PathBuf,
    /// Maximum concurrent transfers; zero is treated as one.
    pub workers: usize,
}

/// Executes transfers for a selection and verifies what lands.
pub struct DownloadEngine {
    config: EngineConfig,
    layout: ArchiveLayout,
    transfer: Arc<dyn Transfer>,
    verifier: IntegrityVerifier,
}

impl DownloadEngine {
    /// Create an engine.
    #[must_use]
    pub fn new(config: EngineConfig, layout: ArchiveLayout, transfer: Arc<dyn Transfer>) -> Self {
        Self {
            config,
            layout,
            transfer,
            verifier: IntegrityVerifier::new(),
        }
    }

    /// Return the directory holding every file for `version`.
    #[must_use]
    pub fn version_dir(&self, version: &KernelVersion) -> Utf8PathBuf {
        self.config.destination_root.join(version.to_string())
    }

    /// Return the final local path of `asset`.
    #[must_use]
    pub fn destination_for(&self, version: &KernelVersion, asset: &PackageAsset) -> Utf8PathBuf {
        self.version_dir(version)
            .join(asset.architecture().as_str())
            .join(asset.flavor().as_str())
            .join(asset.file_name())
    }

    /// Download and verify every selected asset.
    ///
    /// Assets are independent: a failed transfer is recorded and the rest
    /// carry on. Verification of an asset starts only after its transfer
    /// has finished. Partial files left behind by an interrupted earlier
    /// run are removed from the target directories first.
    #[must_use]
    pub fn download(&self, version: &KernelVersion, selection: &Selection<'_>) -> DownloadBatch {
        let assets: Vec<&PackageAsset> = selection.iter().collect();
        let target_dirs: BTreeSet<Utf8PathBuf> = assets
            .iter()
            .filter_map(|asset| {
                self.destination_for(version, asset)
                    .parent()
                    .map(Utf8Path::to_path_buf)
            })
            .collect();
        for dir in &target_dirs {
            remove_stale_partials(dir);
        }

        let outcomes = run_bounded(assets, self.config.workers, |asset| {
            self.fetch_asset(version, asset)
                .map(|result| self.verifier.verify(result, asset.digest()))
        });

        let mut batch = DownloadBatch::default();
        for outcome in outcomes {
            match outcome {
                Ok(result) => batch.results.push(result),
                Err(failure) => batch.failures.push(failure),
            }
        }
        batch
    }

    /// Put one asset on disk without verifying it.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferFailure`] when the destination cannot be prepared
    /// or the transfer fails.
    pub fn fetch_asset(
        &self,
        version: &KernelVersion,
        asset: &PackageAsset,
    ) -> Result<DownloadResult, TransferFailure> {
        let url = self.layout.file_url(version, asset.file_name());
        let dest = self.destination_for(version, asset);
        let failure = |reason: String| TransferFailure {
            file_name: asset.file_name().to_owned(),
            url: url.clone(),
            reason,
        };

        if let Some(size) = existing_size(&dest) {
            log::debug!("{dest} already present ({size} bytes); skipping transfer");
            return Ok(DownloadResult::transferred(
                asset.file_name(),
                dest,
                size,
                TransferMechanism::AlreadyPresent,
            ));
        }

        let byte_count = self
            .transfer_into_place(&url, &dest)
            .map_err(|err| failure(err.to_string()))?;
        log::debug!("fetched {url} ({byte_count} bytes)");
        Ok(DownloadResult::transferred(
            asset.file_name(),
            dest,
            byte_count,
            self.transfer.mechanism(),
        ))
    }

    fn transfer_into_place(&self, url: &str, dest: &Utf8Path) -> Result<u64, TransferError> {
        let parent = dest.parent().unwrap_or(Utf8Path::new("."));
        // Concurrent workers may race to create the same level.
        fs::create_dir_all(parent)?;

        let partial = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(parent)?;
        let partial_path = Utf8Path::from_path(partial.path()).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("temporary path under {parent} is not UTF-8"),
            )
        })?;

        let byte_count = self.transfer.fetch(url, partial_path)?;
        partial.persist(dest).map_err(|err| err.error)?;
        Ok(byte_count)
    }
}

/// Delete leftover temp files from transfers that never completed.
///
/// A directory that does not exist yet has nothing to clean. Failures are
/// logged and otherwise ignored.
fn remove_stale_partials(dir: &Utf8Path) {
    let Ok(entries) = dir.read_dir_utf8() else {
        return;
    };
    for entry in entries.flatten() {
        if !entry.file_name().starts_with(PARTIAL_PREFIX) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => log::debug!("removed stale partial file {}", entry.path()),
            Err(err) => log::warn!("could not remove stale partial file {}: {err}", entry.path()),
        }
    }
}

/// Return the size of a non-empty regular file at `path`.
fn existing_size(path: &Utf8Path) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(|meta| meta.is_file() && meta.len() > 0)
        .map(|meta| meta.len())
}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;

//! Resolution, catalog and download orchestration.
//!
//! The pipeline runs in two halves around the operator's choice:
//!
//! 1. [`Pipeline::prepare`] resolves the version, fetches its manifest and
//!    builds the catalog. Any failure here aborts the run.
//! 2. [`Pipeline::download`] fetches and verifies a selection. Per-package
//!    failures are collected in the [`RunReport`], never raised.

use crate::archive::http::ArchiveClient;
use crate::archive::layout::{ArchiveLayout, MANIFEST_FILE_NAME};
use crate::archive::manifest::ManifestFetcher;
use crate::archive::releases::VersionResolver;
use crate::catalog::builder::{CatalogBuild, GroupKey, build_catalog_with};
use crate::catalog::classify::PackageRole;
use crate::catalog::selection::Selection;
use crate::config::Config;
use crate::download::{AssetState, DownloadEngine, DownloadResult, EngineConfig, TransferFailure};
use crate::error::{InstallerError, Result};
use crate::transfer::Transfer;
use crate::version::KernelVersion;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::sync::Arc;

/// A version with its manifest and catalog, ready for selection.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    /// The resolved version.
    pub version: KernelVersion,
    /// The raw manifest text.
    pub manifest: String,
    /// The catalog and its parse report.
    pub build: CatalogBuild,
}

impl PreparedRun {
    /// Select a group, its shared packages, and optionally only some roles.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::GroupNotFound`] when the catalog has no
    /// such group, and [`InstallerError::EmptySelection`] when `roles`
    /// filters out every package of the group.
    pub fn select(&self, group: GroupKey, roles: &[PackageRole]) -> Result<Selection<'_>> {
        if !self.build.catalog.contains_group(group) {
            let available = self
                .build
                .catalog
                .groups()
                .map(|(key, _)| key)
                .filter(|key| *key != GroupKey::shared())
                .map(|key| key.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(InstallerError::GroupNotFound {
                version: self.version,
                group,
                available,
            });
        }
        let selection = Selection::for_group(&self.build.catalog, group).with_roles(roles);
        if selection.is_empty() {
            return Err(InstallerError::EmptySelection {
                version: self.version,
                group,
                roles: roles
                    .iter()
                    .copied()
                    .map(PackageRole::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        Ok(selection)
    }
}

/// A file whose bytes do not match the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestMismatch {
    /// The package file name.
    pub file_name: String,
    /// Where the file lives.
    pub local_path: Utf8PathBuf,
    /// The digest the manifest declares.
    pub expected: String,
    /// The digest of the bytes on disk, when they could be read.
    pub actual: Option<String>,
}

/// Outcome of a download run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// The version that was downloaded.
    pub version: KernelVersion,
    /// One record per file on disk, verified or mismatched.
    pub results: Vec<DownloadResult>,
    /// Transfers that failed.
    pub failures: Vec<TransferFailure>,
    /// Files that failed verification.
    pub mismatches: Vec<DigestMismatch>,
}

impl RunReport {
    /// Return paths of files that passed verification, in selection order.
    #[must_use]
    pub fn verified_paths(&self) -> Vec<Utf8PathBuf> {
        self.results
            .iter()
            .filter(|result| result.verified_digest_match())
            .map(|result| result.local_path().to_owned())
            .collect()
    }

    /// Return whether every selected package verified.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.mismatches.is_empty()
    }
}

/// Wires configuration to the components of one run.
pub struct Pipeline<'a> {
    config: &'a Config,
    client: &'a dyn ArchiveClient,
    transfer: Arc<dyn Transfer>,
    destination_root: Utf8PathBuf,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline.
    #[must_use]
    pub fn new(
        config: &'a Config,
        client: &'a dyn ArchiveClient,
        transfer: Arc<dyn Transfer>,
        destination_root: Utf8PathBuf,
    ) -> Self {
        Self {
            config,
            client,
            transfer,
            destination_root,
        }
    }

    fn layout(&self) -> ArchiveLayout {
        ArchiveLayout::new(self.config.archive_url.as_str())
    }

    /// Resolve the version, fetch its manifest and build the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Resolution`] or [`InstallerError::Manifest`]
    /// when no catalog can be built.
    pub fn prepare(&self) -> Result<PreparedRun> {
        let version = VersionResolver::new(self.client, self.config.release_metadata_url.as_str())
            .with_forced_version(self.config.forced_version.clone())
            .resolve_latest_stable()?;
        let manifest = ManifestFetcher::new(self.client, self.layout()).fetch_manifest(&version)?;
        let build = build_catalog_with(&manifest, self.config.digest_algorithm);
        log::debug!(
            "catalog for {version}: {} packages, {} skipped lines",
            build.catalog.len(),
            build.report.skipped_count()
        );
        Ok(PreparedRun {
            version,
            manifest,
            build,
        })
    }

    /// Download and verify `selection`, storing the manifest alongside.
    #[must_use]
    pub fn download(&self, prepared: &PreparedRun, selection: &Selection<'_>) -> RunReport {
        let engine = DownloadEngine::new(
            EngineConfig {
                destination_root: self.destination_root.clone(),
                workers: self.config.workers,
            },
            self.layout(),
            Arc::clone(&self.transfer),
        );

        let manifest_path = engine.version_dir(&prepared.version).join(MANIFEST_FILE_NAME);
        if let Err(err) = store_manifest(&manifest_path, &prepared.manifest) {
            log::warn!("could not store manifest at {manifest_path}: {err}");
        }

        let batch = engine.download(&prepared.version, selection);
        let mismatches = batch
            .results
            .iter()
            .filter(|result| result.state() == AssetState::Mismatched)
            .filter_map(|result| {
                let asset = prepared.build.catalog.find(result.file_name())?;
                Some(DigestMismatch {
                    file_name: result.file_name().to_owned(),
                    local_path: result.local_path().to_owned(),
                    expected: asset.digest().as_str().to_owned(),
                    actual: result.actual_digest().map(str::to_owned),
                })
            })
            .collect();

        RunReport {
            version: prepared.version,
            results: batch.results,
            failures: batch.failures,
            mismatches,
        }
    }
}

/// Write the manifest text next to the downloaded packages.
///
/// # Errors
///
/// Returns any I/O error raised while writing.
pub fn store_manifest(path: &Utf8Path, manifest: &str) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Utf8Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    std::io::Write::write_all(&mut staged, manifest.as_bytes())?;
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;

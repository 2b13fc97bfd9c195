//! Catalog construction from raw manifest text.
//!
//! Parsing is tolerant: malformed lines are skipped and reported, and file
//! names outside the classification grammar are left out of every group.
//! The set of groups comes from the data; nothing here lists which
//! architecture and flavor pairs an archive is expected to publish.

use super::checksum::{ChecksumEntry, LineOutcome, MalformedReason, ParseWarning, parse_line};
use super::classify::{Architecture, Classification, Flavor, PackageRole, classify};
use super::digest::{Digest, DigestAlgorithm};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// The `(architecture, flavor)` pair a catalog groups assets by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    /// Architecture token.
    pub architecture: Architecture,
    /// Flavor token.
    pub flavor: Flavor,
}

impl GroupKey {
    /// Construct a group key.
    #[must_use]
    pub const fn new(architecture: Architecture, flavor: Flavor) -> Self {
        Self {
            architecture,
            flavor,
        }
    }

    /// The group holding arch-independent shared packages.
    #[must_use]
    pub const fn shared() -> Self {
        Self::new(Architecture::All, Flavor::Common)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.architecture, self.flavor)
    }
}

/// A downloadable package: one checksum entry plus its classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PackageAsset {
    #[serde(flatten)]
    entry: ChecksumEntry,
    #[serde(flatten)]
    class: Classification,
}

impl PackageAsset {
    /// Return the file name within the build directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.entry.file_name()
    }

    /// Return the digest the manifest declares for this file.
    #[must_use]
    pub const fn digest(&self) -> &Digest {
        self.entry.digest()
    }

    /// Return the architecture.
    #[must_use]
    pub const fn architecture(&self) -> Architecture {
        self.class.architecture
    }

    /// Return the flavor.
    #[must_use]
    pub const fn flavor(&self) -> Flavor {
        self.class.flavor
    }

    /// Return the package role.
    #[must_use]
    pub const fn role(&self) -> PackageRole {
        self.class.role
    }

    /// Return the group this asset belongs to.
    #[must_use]
    pub const fn group(&self) -> GroupKey {
        GroupKey::new(self.class.architecture, self.class.flavor)
    }
}

/// Packages grouped by `(architecture, flavor)`, in manifest order within a group.
///
/// Immutable once built; a new manifest means a new catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    groups: BTreeMap<GroupKey, Vec<PackageAsset>>,
}

impl Catalog {
    /// Iterate over groups in architecture then flavor order.
    pub fn groups(&self) -> impl Iterator<Item = (GroupKey, &[PackageAsset])> {
        self.groups.iter().map(|(key, assets)| (*key, assets.as_slice()))
    }

    /// Return the assets of one group, empty when the group is absent.
    #[must_use]
    pub fn group(&self, key: GroupKey) -> &[PackageAsset] {
        self.groups.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Return whether the catalog has a group for `key`.
    #[must_use]
    pub fn contains_group(&self, key: GroupKey) -> bool {
        self.groups.contains_key(&key)
    }

    /// Iterate over every asset.
    pub fn assets(&self) -> impl Iterator<Item = &PackageAsset> {
        self.groups.values().flatten()
    }

    /// Look up an asset by file name.
    #[must_use]
    pub fn find(&self, file_name: &str) -> Option<&PackageAsset> {
        self.assets().find(|asset| asset.file_name() == file_name)
    }

    /// Return the number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Return whether the catalog has no assets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// What the parser saw while building a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Well-formed entries for the configured algorithm.
    pub entries: usize,
    /// Lines skipped as malformed, in manifest order.
    pub skipped: Vec<ParseWarning>,
    /// Well-formed entries whose file name did not classify.
    pub unclassified: Vec<String>,
    /// Lines carrying a digest for a different algorithm.
    pub other_algorithm: usize,
}

impl ParseReport {
    /// Return the number of malformed lines.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// A freshly built catalog together with its parse report.
#[derive(Debug, Clone)]
pub struct CatalogBuild {
    /// The catalog.
    pub catalog: Catalog,
    /// Parse diagnostics for the caller to surface.
    pub report: ParseReport,
}

/// Build a catalog from a SHA-1 manifest.
///
/// # Examples
///
/// ```
/// use upkern_installer::catalog::builder::build_catalog;
///
/// let manifest = format!(
///     "{}  linux-image-4.9.6-040906-generic_4.9.6-040906.201701260330_amd64.deb\nnot a line\n",
///     "a".repeat(40),
/// );
/// let build = build_catalog(&manifest);
/// assert_eq!(build.catalog.len(), 1);
/// assert_eq!(build.report.skipped_count(), 1);
/// ```
#[must_use]
pub fn build_catalog(raw_manifest: &str) -> CatalogBuild {
    build_catalog_with(raw_manifest, DigestAlgorithm::default())
}

/// Build a catalog from a manifest published with `algorithm`.
#[must_use]
pub fn build_catalog_with(raw_manifest: &str, algorithm: DigestAlgorithm) -> CatalogBuild {
    let mut groups: BTreeMap<GroupKey, Vec<PackageAsset>> = BTreeMap::new();
    let mut report = ParseReport::default();
    let mut seen_names: HashSet<String> = HashSet::new();

    for (index, line) in raw_manifest.lines().enumerate() {
        let line_number = index + 1;
        let entry = match parse_line(line, line_number, algorithm) {
            LineOutcome::Entry(entry) => entry,
            LineOutcome::Ignored => continue,
            LineOutcome::OtherAlgorithm => {
                report.other_algorithm += 1;
                continue;
            }
            LineOutcome::Malformed(warning) => {
                log::debug!("skipping manifest {warning}");
                report.skipped.push(warning);
                continue;
            }
        };

        if !seen_names.insert(entry.file_name().to_owned()) {
            report.skipped.push(ParseWarning {
                line_number,
                reason: MalformedReason::DuplicateFileName(entry.file_name().to_owned()),
            });
            continue;
        }
        report.entries += 1;

        let Some(class) = classify(entry.file_name()) else {
            log::trace!("excluding unclassified file {}", entry.file_name());
            report.unclassified.push(entry.file_name().to_owned());
            continue;
        };

        let asset = PackageAsset { entry, class };
        groups.entry(asset.group()).or_default().push(asset);
    }

    CatalogBuild {
        catalog: Catalog { groups },
        report,
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;

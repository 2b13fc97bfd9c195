//! Unit tests for catalog construction.

use super::*;
use rstest::rstest;

const RELEASE: &str = "4.9.6-040906";
const PACKAGE_VERSION: &str = "4.9.6-040906.201701260330";

fn sha1_for(seed: usize) -> String {
    format!("{seed:040x}")
}

fn deb(role: &str, flavor: Option<&str>, arch: &str) -> String {
    match flavor {
        Some(flavor) => format!("linux-{role}-{RELEASE}-{flavor}_{PACKAGE_VERSION}_{arch}.deb"),
        None => format!("linux-{role}-{RELEASE}_{PACKAGE_VERSION}_{arch}.deb"),
    }
}

fn line(seed: usize, name: &str) -> String {
    format!("{}  {name}\n", sha1_for(seed))
}

fn typical_manifest() -> String {
    [
        line(1, &deb("headers", None, "all")),
        line(2, &deb("headers", Some("generic"), "amd64")),
        line(3, &deb("image", Some("generic"), "amd64")),
        line(4, &deb("headers", Some("lowlatency"), "amd64")),
        line(5, &deb("image", Some("lowlatency"), "amd64")),
        line(6, &deb("image", Some("generic"), "i386")),
        line(7, &deb("image", Some("generic-lpae"), "armhf")),
    ]
    .concat()
}

#[test]
fn groups_are_derived_from_recognised_names() {
    let build = build_catalog(&typical_manifest());
    let keys: Vec<GroupKey> = build.catalog.groups().map(|(key, _)| key).collect();
    assert_eq!(
        keys,
        vec![
            GroupKey::new(Architecture::Amd64, Flavor::Lowlatency),
            GroupKey::new(Architecture::Amd64, Flavor::Generic),
            GroupKey::new(Architecture::Armhf, Flavor::GenericLpae),
            GroupKey::new(Architecture::I386, Flavor::Generic),
            GroupKey::shared(),
        ]
    );
    assert_eq!(build.catalog.len(), 7);
    assert_eq!(build.report.entries, 7);
    assert_eq!(build.report.skipped_count(), 0);
}

#[test]
fn group_preserves_manifest_order() {
    let build = build_catalog(&typical_manifest());
    let generic = build
        .catalog
        .group(GroupKey::new(Architecture::Amd64, Flavor::Generic));
    let roles: Vec<PackageRole> = generic.iter().map(PackageAsset::role).collect();
    assert_eq!(roles, vec![PackageRole::Headers, PackageRole::Image]);
    assert_eq!(generic[0].digest().as_str(), sha1_for(2));
}

#[test]
fn partial_corruption_yields_partial_catalog() {
    let mut manifest = String::new();
    for seed in 0..48 {
        let name = format!("linux-image-4.9.{seed}-040906-generic_4.9.{seed}-040906.1_amd64.deb");
        manifest.push_str(&line(seed, &name));
    }
    manifest.insert_str(0, "this line is damaged\n");
    manifest.push_str("deadbeef linux-image-truncated\n");

    let build = build_catalog(&manifest);
    assert_eq!(build.catalog.len(), 48);
    assert_eq!(build.report.skipped_count(), 2);
    let lines: Vec<usize> = build.report.skipped.iter().map(|w| w.line_number).collect();
    assert_eq!(lines, vec![1, 50]);
}

#[test]
fn unclassified_names_never_appear_in_groups() {
    let manifest = [
        line(1, &deb("image", Some("generic"), "amd64")),
        line(2, &deb("tools", Some("generic"), "amd64")),
        line(3, &deb("image", Some("realtime"), "amd64")),
        line(4, "linux-source.tar.xz"),
    ]
    .concat();

    let build = build_catalog(&manifest);
    assert_eq!(build.catalog.len(), 1);
    assert_eq!(build.report.entries, 4);
    assert_eq!(build.report.unclassified.len(), 3);
    for name in &build.report.unclassified {
        assert!(build.catalog.find(name).is_none(), "{name} leaked into catalog");
    }
}

#[test]
fn duplicate_file_names_keep_the_first_entry() {
    let name = deb("image", Some("generic"), "amd64");
    let manifest = [line(1, &name), line(2, &name)].concat();

    let build = build_catalog(&manifest);
    assert_eq!(build.catalog.len(), 1);
    assert_eq!(
        build.catalog.find(&name).map(|a| a.digest().as_str().to_owned()),
        Some(sha1_for(1))
    );
    assert!(matches!(
        build.report.skipped.first().map(|w| &w.reason),
        Some(MalformedReason::DuplicateFileName(_))
    ));
}

#[test]
fn sectioned_manifest_counts_other_algorithm_lines() {
    let name = deb("image", Some("generic"), "amd64");
    let manifest = format!(
        "# Checksums-Sha1:\n{}\n# Checksums-Sha256:\n{}  {name}\n",
        line(1, &name).trim_end(),
        "c".repeat(64),
    );

    let build = build_catalog(&manifest);
    assert_eq!(build.catalog.len(), 1);
    assert_eq!(build.report.other_algorithm, 1);
    assert_eq!(build.report.skipped_count(), 0);
}

#[test]
fn sha256_algorithm_uses_the_sha256_section() {
    let name = deb("image", Some("generic"), "amd64");
    let sha256 = "c".repeat(64);
    let manifest = format!("{}{sha256}  {name}\n", line(1, &name));

    let build = build_catalog_with(&manifest, DigestAlgorithm::Sha256);
    let asset = build.catalog.find(&name).expect("asset present");
    assert_eq!(asset.digest().as_str(), sha256);
    assert_eq!(build.report.other_algorithm, 1);
}

#[rstest]
#[case::empty("")]
#[case::comments_only("# nothing here\n\n")]
fn empty_manifest_yields_empty_catalog(#[case] manifest: &str) {
    let build = build_catalog(manifest);
    assert!(build.catalog.is_empty());
    assert_eq!(build.report, ParseReport::default());
}

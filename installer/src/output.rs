//! Output formatting for the upkern CLI.
//!
//! Human-readable text goes to stdout for results and to stderr for
//! progress; JSON renderings exist for scripting.

use crate::catalog::builder::CatalogBuild;
use crate::download::AssetState;
use crate::pipeline::RunReport;
use crate::version::KernelVersion;
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::io::Write;

/// Write a line to stderr, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

fn counted(count: usize, singular: &str, plural: &str) -> String {
    let noun = if count == 1 { singular } else { plural };
    format!("{count} {noun}")
}

/// One-line summary of a catalog build.
///
/// # Examples
///
/// ```
/// use upkern_installer::catalog::builder::build_catalog;
/// use upkern_installer::output::catalog_summary;
///
/// let build = build_catalog("not a checksum line\n");
/// let version = "4.9.6".parse().expect("valid version");
/// assert_eq!(
///     catalog_summary(&version, &build),
///     "Kernel 4.9.6: 0 packages in 0 groups (0 manifest entries, 1 skipped line, 0 unclassified)"
/// );
/// ```
#[must_use]
pub fn catalog_summary(version: &KernelVersion, build: &CatalogBuild) -> String {
    let report = &build.report;
    format!(
        "Kernel {version}: {} in {} ({}, {}, {} unclassified)",
        counted(build.catalog.len(), "package", "packages"),
        counted(build.catalog.groups().count(), "group", "groups"),
        counted(report.entries, "manifest entry", "manifest entries"),
        counted(report.skipped_count(), "skipped line", "skipped lines"),
        report.unclassified.len(),
    )
}

/// Render the catalog as a group table preceded by its summary.
#[must_use]
pub fn render_catalog(version: &KernelVersion, build: &CatalogBuild) -> String {
    let mut text = catalog_summary(version, build);
    text.push('\n');
    for (key, assets) in build.catalog.groups() {
        let roles: Vec<&str> = assets.iter().map(|asset| asset.role().as_str()).collect();
        let _ = writeln!(text, "  {:<24} {}", key.to_string(), roles.join(", "));
    }
    for warning in &build.report.skipped {
        let _ = writeln!(text, "  skipped manifest {warning}");
    }
    text
}

/// Render the catalog as JSON.
#[must_use]
pub fn catalog_json(version: &KernelVersion, build: &CatalogBuild) -> Value {
    let groups: Vec<Value> = build
        .catalog
        .groups()
        .map(|(key, assets)| {
            json!({
                "architecture": key.architecture,
                "flavor": key.flavor,
                "packages": assets,
            })
        })
        .collect();
    let skipped: Vec<Value> = build
        .report
        .skipped
        .iter()
        .map(|warning| json!({"line": warning.line_number, "reason": warning.reason.to_string()}))
        .collect();
    json!({
        "version": version,
        "groups": groups,
        "report": {
            "entries": build.report.entries,
            "skipped": skipped,
            "unclassified": build.report.unclassified,
            "other_algorithm": build.report.other_algorithm,
        },
    })
}

/// Render a run report as text.
#[must_use]
pub fn render_run_report(report: &RunReport) -> String {
    let mut text = String::new();
    for result in &report.results {
        let label = match result.state() {
            AssetState::Verified => "verified",
            _ => "MISMATCH",
        };
        let _ = writeln!(
            text,
            "  {label:<9} {} ({}, {} bytes)",
            result.local_path(),
            result.mechanism(),
            result.byte_count()
        );
    }
    for failure in &report.failures {
        let _ = writeln!(text, "  {:<9} {}: {}", "FAILED", failure.file_name, failure.reason);
    }
    let verified = report.verified_paths().len();
    let _ = write!(
        text,
        "Kernel {}: {verified} verified, {} mismatched, {} failed",
        report.version,
        report.mismatches.len(),
        report.failures.len()
    );
    text
}

/// Render a run report as JSON.
///
/// # Errors
///
/// Returns a serialisation error, which cannot happen for well-formed
/// reports but is propagated rather than hidden.
pub fn run_report_json(report: &RunReport) -> serde_json::Result<Value> {
    serde_json::to_value(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builder::build_catalog;
    use crate::download::{DownloadResult, TransferFailure};
    use crate::transfer::TransferMechanism;
    use camino::Utf8PathBuf;

    const IMAGE: &str = "linux-image-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb";

    fn version() -> KernelVersion {
        "4.9.6".parse().expect("valid version")
    }

    fn build() -> CatalogBuild {
        build_catalog(&format!(
            "{}  {IMAGE}\n{}  linux-source.tar.xz\ngarbage\n",
            "a".repeat(40),
            "b".repeat(40)
        ))
    }

    #[test]
    fn summary_counts_everything() {
        assert_eq!(
            catalog_summary(&version(), &build()),
            "Kernel 4.9.6: 1 package in 1 group (2 manifest entries, 1 skipped line, 1 unclassified)"
        );
    }

    #[test]
    fn catalog_table_lists_groups() {
        let text = render_catalog(&version(), &build());
        assert!(text.contains("amd64/generic"));
        assert!(text.contains("image"));
        assert!(text.contains("skipped manifest line 3"));
    }

    #[test]
    fn catalog_json_exposes_packages() {
        let value = catalog_json(&version(), &build());
        assert_eq!(value["version"], "4.9.6");
        assert_eq!(value["groups"][0]["architecture"], "amd64");
        assert_eq!(value["groups"][0]["packages"][0]["file_name"], IMAGE);
        assert_eq!(value["report"]["skipped"][0]["line"], 3);
    }

    fn report() -> RunReport {
        let verified = DownloadResult::transferred(
            IMAGE,
            Utf8PathBuf::from("/k/4.9.6/amd64/generic").join(IMAGE),
            42,
            TransferMechanism::Builtin,
        )
        .finish(AssetState::Verified, Some("a".repeat(40)));
        RunReport {
            version: version(),
            results: vec![verified],
            failures: vec![TransferFailure {
                file_name: "linux-modules.deb".to_owned(),
                url: "https://archive.test/v4.9.6/linux-modules.deb".to_owned(),
                reason: "not found".to_owned(),
            }],
            mismatches: Vec::new(),
        }
    }

    #[test]
    fn run_report_text_lists_outcomes() {
        let text = render_run_report(&report());
        assert!(text.contains("verified"));
        assert!(text.contains("builtin, 42 bytes"));
        assert!(text.contains("FAILED    linux-modules.deb: not found"));
        assert!(text.ends_with("Kernel 4.9.6: 1 verified, 0 mismatched, 1 failed"));
    }

    #[test]
    fn run_report_json_uses_kebab_case_states() {
        let value = run_report_json(&report()).expect("serialisable");
        assert_eq!(value["version"], "4.9.6");
        assert_eq!(value["results"][0]["state"], "verified");
        assert_eq!(value["results"][0]["mechanism"], "builtin");
        assert_eq!(value["failures"][0]["reason"], "not found");
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "Fetching manifest");
        assert_eq!(buffer, b"Fetching manifest\n");
    }
}

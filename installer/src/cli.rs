//! CLI argument definitions for upkern.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::catalog::builder::GroupKey;
use crate::catalog::classify::{Architecture, Flavor, PackageRole};
use crate::config::ConfigOverrides;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Download and verify the latest stable mainline kernel packages.
#[derive(Parser, Debug)]
#[command(name = "upkern")]
#[command(version, about)]
#[command(long_about = concat!(
    "Download and verify the latest stable mainline kernel packages.\n\n",
    "upkern asks kernel.org for the current stable release, reads the matching ",
    "CHECKSUMS manifest from the mainline package archive, and downloads the ",
    "packages for one architecture and flavor. Every file is checked against ",
    "the manifest before it can be handed to dpkg.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Show what the archive offers for the latest stable kernel:\n",
    "    $ upkern list\n\n",
    "  Download the generic amd64 packages:\n",
    "    $ upkern download --arch amd64 --flavor generic\n\n",
    "  Download and install a specific version:\n",
    "    $ sudo upkern --kernel-version 6.11.5 download --arch amd64 --flavor generic --install\n\n",
    "EXIT STATUS:\n",
    "  0  every selected package verified\n",
    "  1  the run aborted before downloading\n",
    "  2  some packages failed to download or verify",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Fetch this version instead of the latest stable release.
    #[arg(long, global = true, value_name = "VERSION")]
    pub kernel_version: Option<String>,

    /// Root of the download tree [default: ~/Downloads/StableUpstreamKernels].
    #[arg(short, long, global = true, value_name = "DIR")]
    pub destination: Option<Utf8PathBuf>,

    /// Maximum concurrent downloads.
    #[arg(short, long, global = true, value_name = "N")]
    pub workers: Option<usize>,

    /// Use the built-in downloader even when wget or curl is installed.
    #[arg(long, global = true)]
    pub builtin_transfer: bool,

    /// Configuration file [default: $UPKERN_CONFIG or the platform config dir].
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl GlobalArgs {
    /// Return the configuration overrides these options carry.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            forced_version: self.kernel_version.clone(),
            destination_root: self.destination.clone(),
            workers: self.workers,
            builtin_transfer: self.builtin_transfer,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the package groups published for the version.
    List(ListArgs),

    /// Download and verify one architecture and flavor.
    Download(DownloadArgs),
}

/// Arguments for the list command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the download command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DownloadArgs {
    /// Architecture token, e.g. amd64.
    #[arg(long, value_parser = parse_architecture)]
    pub arch: Architecture,

    /// Flavor token, e.g. generic or lowlatency.
    #[arg(long, value_parser = parse_flavor)]
    pub flavor: Flavor,

    /// Only download these package roles (can be repeated).
    #[arg(long = "role", value_name = "ROLE", value_parser = parse_role)]
    pub roles: Vec<PackageRole>,

    /// Install verified packages with dpkg afterwards (requires root).
    #[arg(long)]
    pub install: bool,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

impl DownloadArgs {
    /// Return the requested catalog group.
    #[must_use]
    pub const fn group(&self) -> GroupKey {
        GroupKey::new(self.arch, self.flavor)
    }
}

fn token_error(kind: &str, value: &str, known: &[&str]) -> String {
    format!("unknown {kind} {value:?}; expected one of: {}", known.join(", "))
}

fn parse_architecture(value: &str) -> Result<Architecture, String> {
    Architecture::from_token(value)
        .filter(|arch| *arch != Architecture::All)
        .ok_or_else(|| {
            let known: Vec<&str> = Architecture::ALL
                .iter()
                .filter(|arch| **arch != Architecture::All)
                .map(|arch| arch.as_str())
                .collect();
            token_error("architecture", value, &known)
        })
}

fn parse_flavor(value: &str) -> Result<Flavor, String> {
    Flavor::from_token(value)
        .filter(|flavor| *flavor != Flavor::Common)
        .ok_or_else(|| {
            let known: Vec<&str> = Flavor::ALL
                .iter()
                .filter(|flavor| **flavor != Flavor::Common)
                .map(|flavor| flavor.as_str())
                .collect();
            token_error("flavor", value, &known)
        })
}

fn parse_role(value: &str) -> Result<PackageRole, String> {
    PackageRole::from_token(value).ok_or_else(|| {
        let known: Vec<&str> = PackageRole::ALL.iter().map(|role| role.as_str()).collect();
        token_error("role", value, &known)
    })
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

//! upkern installer library.
//!
//! This crate resolves the latest stable upstream Linux kernel, reads the
//! mainline build archive's checksum manifest into a selectable catalog, and
//! downloads and verifies the chosen Debian packages. It is used by the
//! `upkern` CLI binary and can be consumed programmatically for testing or
//! custom download workflows.
//!
//! # Modules
//!
//! - [`archive`] - Release metadata, archive layout and manifest retrieval
//! - [`catalog`] - Manifest parsing, package classification and selection
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Layered configuration from defaults, TOML and flags
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`download`] - Bounded, idempotent download engine
//! - [`error`] - Run-aborting error types with recovery hints
//! - [`install`] - Hand-off of verified packages to dpkg
//! - [`output`] - Text and JSON rendering for the CLI
//! - [`pipeline`] - Resolution, catalog and download orchestration
//! - [`pool`] - Bounded worker pool for blocking jobs
//! - [`process`] - External command execution seam
//! - [`transfer`] - External-tool and built-in transfer strategies
//! - [`verify`] - File digest computation and integrity checks
//! - [`version`] - Kernel version parsing and ordering

pub mod archive;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod download;
pub mod error;
pub mod install;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod process;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod transfer;
pub mod verify;
pub mod version;

//! Access to the release metadata source and the mainline package archive.
//!
//! - [`http`]: the text-fetch seam and its `ureq` implementation.
//! - [`layout`]: URL construction for build directories and files.
//! - [`releases`]: latest-stable version resolution.
//! - [`manifest`]: per-version checksum manifest retrieval.

pub mod http;
pub mod layout;
pub mod manifest;
pub mod releases;

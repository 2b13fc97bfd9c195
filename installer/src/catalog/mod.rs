//! Manifest parsing, package classification, and operator selections.
//!
//! # Sub-modules
//!
//! - [`digest`]: Digest algorithm and validated hex digest (`Digest`).
//! - [`checksum`]: Manifest line parsing (`ChecksumEntry`, `ParseWarning`).
//! - [`classify`]: File-name grammar (`Architecture`, `Flavor`, `PackageRole`).
//! - [`builder`]: Catalog construction (`Catalog`, `PackageAsset`, `ParseReport`).
//! - [`selection`]: Operator-chosen subsets of a catalog (`Selection`).

pub mod builder;
pub mod checksum;
pub mod classify;
pub mod digest;
pub mod selection;

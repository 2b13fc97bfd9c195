//! File-name classification grammar for mainline kernel packages.
//!
//! A package file name has three underscore-separated fields followed by
//! `.deb`:
//!
//! ```text
//! linux-<role>-<release>[-<flavor>]_<package-version>_<architecture>.deb
//! ```
//!
//! The role, flavor and architecture are recognised from the enumerated
//! token sets below and the release must look like `4.9.6-040906` (an
//! optional `rcN` suffix on the ABI number is accepted). Every field must
//! match; any other shape yields `None` so that unknown tokens are left out
//! of the catalog instead of being filed under a wrong group.
//!
//! Arch-independent headers (`..._all.deb`) carry no flavor and are
//! classified under the [`Flavor::Common`] pseudo-flavor.

use serde::Serialize;
use std::fmt;

macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $token:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $token)] $variant ),+
        }

        impl $name {
            /// Every known token, in matching order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Return the token as it appears in file names and on disk.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $token),+
                }
            }

            /// Recognise a token, returning `None` for anything unknown.
            #[must_use]
            pub fn from_token(token: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|known| known.as_str() == token)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

token_enum! {
    /// Debian architecture a package is built for.
    Architecture {
        /// 64-bit x86.
        Amd64 => "amd64",
        /// 64-bit ARM.
        Arm64 => "arm64",
        /// 32-bit ARM hard-float.
        Armhf => "armhf",
        /// 32-bit x86.
        I386 => "i386",
        /// 64-bit little-endian POWER.
        Ppc64el => "ppc64el",
        /// 64-bit RISC-V.
        Riscv64 => "riscv64",
        /// IBM Z.
        S390x => "s390x",
        /// Architecture-independent packages.
        All => "all",
    }
}

token_enum! {
    /// Kernel build variant.
    Flavor {
        /// Low-latency build with 64k pages.
        Lowlatency64k => "lowlatency-64k",
        /// Generic build with large physical address extension.
        GenericLpae => "generic-lpae",
        /// Generic build with 64k pages.
        Generic64k => "generic-64k",
        /// Low-latency desktop build.
        Lowlatency => "lowlatency",
        /// Generic build.
        Generic => "generic",
        /// Flavor-independent files shared by every flavor.
        Common => "common",
    }
}

token_enum! {
    /// What a package contributes to a kernel installation.
    PackageRole {
        /// Unsigned kernel image.
        ImageUnsigned => "image-unsigned",
        /// Loadable kernel modules.
        Modules => "modules",
        /// Kernel headers.
        Headers => "headers",
        /// Kernel image.
        Image => "image",
    }
}

/// The classification of one package file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Classification {
    /// Architecture token.
    pub architecture: Architecture,
    /// Flavor token, or [`Flavor::Common`] for arch-independent files.
    pub flavor: Flavor,
    /// Package role token.
    pub role: PackageRole,
}

/// Classify a manifest file name.
///
/// # Examples
///
/// ```
/// use upkern_installer::catalog::classify::{Architecture, Flavor, PackageRole, classify};
///
/// let class = classify("linux-image-4.9.6-040906-generic_4.9.6-040906.201701260330_amd64.deb")
///     .expect("recognised package");
/// assert_eq!(class.architecture, Architecture::Amd64);
/// assert_eq!(class.flavor, Flavor::Generic);
/// assert_eq!(class.role, PackageRole::Image);
///
/// assert!(classify("CHECKSUMS.gpg").is_none());
/// ```
#[must_use]
pub fn classify(file_name: &str) -> Option<Classification> {
    let stem = file_name.strip_suffix(".deb")?;
    let mut fields = stem.split('_');
    let (Some(package), Some(package_version), Some(arch_token), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return None;
    };
    if package_version.is_empty() {
        return None;
    }

    let architecture = Architecture::from_token(arch_token)?;
    let (role, release_and_flavor) = split_role(package)?;
    let (release, flavor) = split_flavor(release_and_flavor, architecture)?;
    if !is_kernel_release(release) {
        return None;
    }

    // Only headers ship without a flavor.
    if flavor == Flavor::Common && role != PackageRole::Headers {
        return None;
    }

    Some(Classification {
        architecture,
        flavor,
        role,
    })
}

fn split_role(package: &str) -> Option<(PackageRole, &str)> {
    let rest = package.strip_prefix("linux-")?;
    PackageRole::ALL.iter().copied().find_map(|role| {
        rest.strip_prefix(role.as_str())
            .and_then(|after| after.strip_prefix('-'))
            .map(|remainder| (role, remainder))
    })
}

fn split_flavor(remainder: &str, architecture: Architecture) -> Option<(&str, Flavor)> {
    if architecture == Architecture::All {
        return Some((remainder, Flavor::Common));
    }
    Flavor::ALL
        .iter()
        .copied()
        .filter(|flavor| *flavor != Flavor::Common)
        .find_map(|flavor| {
            remainder
                .strip_suffix(flavor.as_str())
                .and_then(|before| before.strip_suffix('-'))
                .map(|release| (release, flavor))
        })
}

/// Accept `<n>.<n>[.<n>]-<abi>` where `abi` is digits with an optional `rcN`.
fn is_kernel_release(release: &str) -> bool {
    let Some((numbers, abi)) = release.split_once('-') else {
        return false;
    };
    let segments: Vec<&str> = numbers.split('.').collect();
    let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !(2..=3).contains(&segments.len()) || !segments.iter().copied().all(numeric) {
        return false;
    }
    match abi.split_once("rc") {
        Some((abi_number, rc)) => numeric(abi_number) && numeric(rc),
        None => numeric(abi),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "linux-image-4.9.6-040906-generic_4.9.6-040906.201701260330_amd64.deb",
        Architecture::Amd64,
        Flavor::Generic,
        PackageRole::Image
    )]
    #[case(
        "linux-headers-4.9.6-040906-lowlatency_4.9.6-040906.201701260330_i386.deb",
        Architecture::I386,
        Flavor::Lowlatency,
        PackageRole::Headers
    )]
    #[case(
        "linux-headers-4.9.6-040906_4.9.6-040906.201701260330_all.deb",
        Architecture::All,
        Flavor::Common,
        PackageRole::Headers
    )]
    #[case(
        "linux-image-unsigned-6.1.2-060102-generic-64k_6.1.2-060102.202301041234_arm64.deb",
        Architecture::Arm64,
        Flavor::Generic64k,
        PackageRole::ImageUnsigned
    )]
    #[case(
        "linux-modules-5.0.0-050000rc1-generic-lpae_5.0.0-050000rc1.201901062230_armhf.deb",
        Architecture::Armhf,
        Flavor::GenericLpae,
        PackageRole::Modules
    )]
    fn classifies_known_shapes(
        #[case] name: &str,
        #[case] architecture: Architecture,
        #[case] flavor: Flavor,
        #[case] role: PackageRole,
    ) {
        let class = classify(name).expect("recognised package");
        assert_eq!(class.architecture, architecture);
        assert_eq!(class.flavor, flavor);
        assert_eq!(class.role, role);
    }

    #[rstest]
    #[case::not_a_deb("CHECKSUMS")]
    #[case::unknown_arch("linux-image-4.9.6-040906-generic_4.9.6-040906.1_mips.deb")]
    #[case::unknown_flavor("linux-image-4.9.6-040906-realtime_4.9.6-040906.1_amd64.deb")]
    #[case::unknown_role("linux-tools-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb")]
    #[case::missing_flavor("linux-image-4.9.6-040906_4.9.6-040906.1_amd64.deb")]
    #[case::flavored_all("linux-headers-4.9.6-040906-generic_4.9.6-040906.1_all.deb")]
    #[case::image_without_flavor("linux-image-4.9.6-040906_4.9.6-040906.1_all.deb")]
    #[case::extra_field("linux-image-4.9.6-040906-generic_4.9.6_extra_amd64.deb")]
    #[case::empty_version("linux-image-4.9.6-040906-generic__amd64.deb")]
    #[case::not_linux("firmware-image-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb")]
    #[case::bad_release("linux-image-four-040906-generic_4.9.6-040906.1_amd64.deb")]
    fn excludes_unrecognised_shapes(#[case] name: &str) {
        assert_eq!(classify(name), None, "{name} should not classify");
    }

    #[test]
    fn tokens_round_trip_through_from_token() {
        for flavor in Flavor::ALL {
            assert_eq!(Flavor::from_token(flavor.as_str()), Some(*flavor));
        }
        assert_eq!(Architecture::from_token("amd64"), Some(Architecture::Amd64));
        assert_eq!(Architecture::from_token("x86_64"), None);
    }
}

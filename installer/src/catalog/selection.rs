//! Operator selections over a catalog.
//!
//! A [`Selection`] borrows assets from the [`Catalog`] it was made from, so
//! it cannot outlive the catalog or refer to assets that were never
//! published.

use super::builder::{Catalog, GroupKey, PackageAsset};
use super::classify::PackageRole;

/// A set of catalog assets chosen for download, in selection order.
///
/// # Examples
///
/// ```
/// use upkern_installer::catalog::builder::{GroupKey, build_catalog};
/// use upkern_installer::catalog::classify::{Architecture, Flavor};
/// use upkern_installer::catalog::selection::Selection;
///
/// let manifest = format!(
///     "{}  linux-headers-4.9.6-040906_4.9.6-040906.1_all.deb\n\
///      {}  linux-image-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb\n",
///     "a".repeat(40),
///     "b".repeat(40),
/// );
/// let build = build_catalog(&manifest);
/// let key = GroupKey::new(Architecture::Amd64, Flavor::Generic);
/// let selection = Selection::for_group(&build.catalog, key);
/// assert_eq!(selection.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection<'c> {
    assets: Vec<&'c PackageAsset>,
}

impl<'c> Selection<'c> {
    /// An empty selection, as produced when the operator aborts.
    #[must_use]
    pub const fn empty() -> Self {
        Self { assets: Vec::new() }
    }

    /// Select a group together with the arch-independent shared packages.
    ///
    /// Shared headers are a dependency of every flavored headers package,
    /// so a group selection always carries them.
    #[must_use]
    pub fn for_group(catalog: &'c Catalog, key: GroupKey) -> Self {
        let mut selection = Self::empty();
        if catalog.contains_group(key) && key != GroupKey::shared() {
            selection.extend(catalog.group(GroupKey::shared()));
        }
        selection.extend(catalog.group(key));
        selection
    }

    /// Keep only assets whose role is in `roles`; an empty list keeps everything.
    #[must_use]
    pub fn with_roles(self, roles: &[PackageRole]) -> Self {
        if roles.is_empty() {
            return self;
        }
        Self {
            assets: self
                .assets
                .into_iter()
                .filter(|asset| roles.contains(&asset.role()))
                .collect(),
        }
    }

    /// Add one asset, ignoring repeats.
    pub fn insert(&mut self, asset: &'c PackageAsset) {
        if !self.assets.iter().any(|known| std::ptr::eq(*known, asset)) {
            self.assets.push(asset);
        }
    }

    /// Add several assets, ignoring repeats.
    pub fn extend(&mut self, assets: impl IntoIterator<Item = &'c PackageAsset>) {
        for asset in assets {
            self.insert(asset);
        }
    }

    /// Iterate over the selected assets.
    pub fn iter(&self) -> impl Iterator<Item = &'c PackageAsset> + '_ {
        self.assets.iter().copied()
    }

    /// Return the number of selected assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Return whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl<'c> FromIterator<&'c PackageAsset> for Selection<'c> {
    fn from_iter<I: IntoIterator<Item = &'c PackageAsset>>(iter: I) -> Self {
        let mut selection = Self::empty();
        selection.extend(iter);
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builder::build_catalog;
    use crate::catalog::classify::{Architecture, Flavor};

    fn manifest() -> String {
        [
            ("a", "linux-headers-4.9.6-040906_4.9.6-040906.1_all.deb"),
            ("b", "linux-headers-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb"),
            ("c", "linux-image-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb"),
            ("d", "linux-image-4.9.6-040906-lowlatency_4.9.6-040906.1_amd64.deb"),
        ]
        .iter()
        .map(|(seed, name)| format!("{}  {name}\n", seed.repeat(40)))
        .collect()
    }

    #[test]
    fn group_selection_includes_shared_headers_first() {
        let build = build_catalog(&manifest());
        let key = GroupKey::new(Architecture::Amd64, Flavor::Generic);
        let names: Vec<&str> = Selection::for_group(&build.catalog, key)
            .iter()
            .map(PackageAsset::file_name)
            .collect();
        assert_eq!(
            names,
            vec![
                "linux-headers-4.9.6-040906_4.9.6-040906.1_all.deb",
                "linux-headers-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb",
                "linux-image-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb",
            ]
        );
    }

    #[test]
    fn missing_group_selects_nothing() {
        let build = build_catalog(&manifest());
        let key = GroupKey::new(Architecture::S390x, Flavor::Generic);
        assert!(Selection::for_group(&build.catalog, key).is_empty());
    }

    #[test]
    fn selections_may_span_groups_without_repeats() {
        let build = build_catalog(&manifest());
        let mut selection = Selection::for_group(
            &build.catalog,
            GroupKey::new(Architecture::Amd64, Flavor::Generic),
        );
        let lowlatency = Selection::for_group(
            &build.catalog,
            GroupKey::new(Architecture::Amd64, Flavor::Lowlatency),
        );
        selection.extend(lowlatency.iter());
        assert_eq!(selection.len(), 4);
    }

    #[test]
    fn role_filter_keeps_matching_assets() {
        let build = build_catalog(&manifest());
        let key = GroupKey::new(Architecture::Amd64, Flavor::Generic);
        let selection = Selection::for_group(&build.catalog, key)
            .with_roles(&[PackageRole::Image]);
        let roles: Vec<PackageRole> = selection.iter().map(PackageAsset::role).collect();
        assert_eq!(roles, vec![PackageRole::Image]);
    }

    #[test]
    fn empty_selection_is_empty() {
        assert!(Selection::empty().is_empty());
        assert_eq!(Selection::empty().len(), 0);
    }
}

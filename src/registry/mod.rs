use crate::constraint::VersionComparator;
use std::collections::BTreeMap;

pub mod factory;
#[cfg(test)]
pub mod memory;
pub mod packagist;

pub use factory::RegistryFactory;
pub use packagist::PackagistRegistry;

/// Declared requirement name mapped to its raw constraint string.
pub type RequirementMap = BTreeMap<String, String>;

/// Source of published versions and per-version requirements.
///
/// Lookups are best-effort: an unreachable registry or an unknown package
/// yields empty data rather than an error.
pub trait PackageRegistry: Send + Sync {
    /// Every published version string, any stability, in registry order.
    fn list_versions(&self, name: &str) -> Vec<String>;

    /// Requirements declared by `name` at exactly `version`.
    fn requirements(&self, name: &str, version: &str) -> RequirementMap;

    /// Suggested replacement when the package is abandoned.
    fn replacement(&self, _name: &str) -> Option<String> {
        None
    }

    fn stable_versions_descending(&self, name: &str) -> Vec<String> {
        VersionComparator::stable_descending(&self.list_versions(name))
    }
}

use crate::agents::version_resolver::ConflictRecord;
use crate::constraint::{ConstraintEvaluator, VersionComparator};
use crate::registry::PackageRegistry;
use std::cmp::Ordering;

/// Finds the newest stable release strictly older than a rejected target
/// that satisfies every conflicting constraint.
pub struct FallbackVersionFinder<'a> {
    registry: &'a dyn PackageRegistry,
}

impl<'a> FallbackVersionFinder<'a> {
    pub fn new(registry: &'a dyn PackageRegistry) -> Self {
        Self { registry }
    }

    pub fn find(&self, package: &str, target: &str, conflicts: &[ConflictRecord]) -> Option<String> {
        if conflicts.is_empty() {
            return None;
        }

        self.registry
            .stable_versions_descending(package)
            .into_iter()
            .filter(|v| VersionComparator::compare(v, target) == Some(Ordering::Less))
            .find(|v| {
                conflicts
                    .iter()
                    .all(|c| ConstraintEvaluator::satisfies(v, &c.constraint))
            })
    }
}

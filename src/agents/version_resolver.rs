use crate::agents::dependency_graph::DependencyGraphReader;
use crate::composer::{LockSnapshot, is_platform_package};
use crate::constraint::{Constraint, ConstraintEvaluator, VersionComparator};
use crate::registry::PackageRegistry;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A dependent whose constraint rejected a proposed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRecord {
    pub dependent: String,
    pub constraint: String,
}

/// An installed package that does not meet a proposed version's own requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementConflict {
    pub package: String,
    pub constraint: String,
    pub installed_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Requester {
    pub package: String,
    pub version: String,
}

/// Bump another package needs so a proposed version's requirements hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitiveUpdate {
    pub package: String,
    pub requested_by: BTreeSet<Requester>,
    pub constraint: String,
    pub installed_version: String,
    pub suggested_version: String,
}

/// Run-wide recommendation accumulator, merged by required-package name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitiveUpdates {
    entries: BTreeMap<String, TransitiveUpdate>,
}

impl TransitiveUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first recommendation for a package fixes its constraint and
    /// suggestion; later ones only add requesters.
    pub fn record(&mut self, update: TransitiveUpdate) {
        match self.entries.get_mut(&update.package) {
            Some(existing) => existing.requested_by.extend(update.requested_by),
            None => {
                self.entries.insert(update.package.clone(), update);
            }
        }
    }

    pub fn merge(&mut self, other: TransitiveUpdates) {
        for update in other.entries.into_values() {
            self.record(update);
        }
    }

    #[cfg(test)]
    pub fn get(&self, package: &str) -> Option<&TransitiveUpdate> {
        self.entries.get(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransitiveUpdate> {
        self.entries.values()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<TransitiveUpdate> {
        self.entries.into_values().collect()
    }
}

/// States a package passes through while being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Proposed,
    Accepted,
    RejectedByDependents,
    RejectedByRequirements,
    SubstitutedFromSearch,
    Unresolvable,
}

/// Final verdict for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Accepted {
        version: String,
    },
    RejectedByRequirements {
        proposed: String,
        conflicts: Vec<RequirementConflict>,
    },
    Substituted {
        proposed: String,
        version: String,
        conflicts: Vec<ConflictRecord>,
    },
    Unresolvable {
        proposed: String,
        conflicts: Vec<ConflictRecord>,
    },
}

impl Resolution {
    /// The version that can be installed, if any.
    pub fn version(&self) -> Option<&str> {
        match self {
            Resolution::Accepted { version } | Resolution::Substituted { version, .. } => {
                Some(version.as_str())
            }
            _ => None,
        }
    }

    pub fn dependent_conflicts(&self) -> &[ConflictRecord] {
        match self {
            Resolution::Substituted { conflicts, .. } | Resolution::Unresolvable { conflicts, .. } => {
                conflicts.as_slice()
            }
            _ => &[],
        }
    }

    pub fn state(&self) -> ResolutionState {
        match self {
            Resolution::Accepted { .. } => ResolutionState::Accepted,
            Resolution::RejectedByRequirements { .. } => ResolutionState::RejectedByRequirements,
            Resolution::Substituted { .. } => ResolutionState::SubstitutedFromSearch,
            Resolution::Unresolvable { .. } => ResolutionState::Unresolvable,
        }
    }
}

/// Decides a safe version for one package at a time.
///
/// Installed dependents' constraints are hard bounds: violating any of them
/// triggers a search over older stable releases. A proposal whose own
/// requirements are unmet is rejected outright and never searched.
pub struct VersionResolver<'a> {
    registry: &'a dyn PackageRegistry,
    graph: DependencyGraphReader<'a>,
}

impl<'a> VersionResolver<'a> {
    pub fn new(registry: &'a dyn PackageRegistry, snapshot: &'a LockSnapshot) -> Self {
        Self {
            registry,
            graph: DependencyGraphReader::new(snapshot),
        }
    }

    pub fn resolve(
        &self,
        package: &str,
        proposed: &str,
        recommendations: &mut TransitiveUpdates,
    ) -> Resolution {
        debug!(%package, %proposed, state = ?ResolutionState::Proposed, "resolving");

        let dependents = self.graph.dependents(package);
        let conflicts = Self::dependent_conflicts(&dependents, proposed);

        if !conflicts.is_empty() {
            debug!(
                %package,
                %proposed,
                conflicts = conflicts.len(),
                state = ?ResolutionState::RejectedByDependents,
                "rejected by dependents, searching older releases"
            );

            return match self.search(package, proposed, &dependents, recommendations) {
                Some(version) => {
                    debug!(%package, %version, state = ?ResolutionState::SubstitutedFromSearch, "substituted");
                    Resolution::Substituted {
                        proposed: proposed.to_string(),
                        version,
                        conflicts,
                    }
                }
                None => {
                    debug!(%package, state = ?ResolutionState::Unresolvable, "no compatible release");
                    Resolution::Unresolvable {
                        proposed: proposed.to_string(),
                        conflicts,
                    }
                }
            };
        }

        let requirement_conflicts = self.check_requirements(package, proposed, recommendations);
        if !requirement_conflicts.is_empty() {
            debug!(
                %package,
                %proposed,
                conflicts = requirement_conflicts.len(),
                state = ?ResolutionState::RejectedByRequirements,
                "own requirements unmet"
            );
            return Resolution::RejectedByRequirements {
                proposed: proposed.to_string(),
                conflicts: requirement_conflicts,
            };
        }

        debug!(%package, %proposed, state = ?ResolutionState::Accepted, "accepted");
        Resolution::Accepted {
            version: proposed.to_string(),
        }
    }

    fn dependent_conflicts(dependents: &BTreeMap<String, String>, version: &str) -> Vec<ConflictRecord> {
        dependents
            .iter()
            .filter(|(_, constraint)| !ConstraintEvaluator::satisfies(version, constraint))
            .map(|(dependent, constraint)| ConflictRecord {
                dependent: dependent.clone(),
                constraint: constraint.clone(),
            })
            .collect()
    }

    /// Check `version`'s declared requirements against what is installed,
    /// queueing a transitive update for every conflict that has a fix.
    fn check_requirements(
        &self,
        package: &str,
        version: &str,
        recommendations: &mut TransitiveUpdates,
    ) -> Vec<RequirementConflict> {
        let mut conflicts = Vec::new();
        let requester = Requester {
            package: package.to_string(),
            version: version.to_string(),
        };

        for (required, constraint) in self.registry.requirements(package, version) {
            if is_platform_package(&required) {
                continue;
            }

            let Some(installed) = self.graph.installed_version(&required) else {
                // Not installed yet: it will be pulled in at whatever version fits
                continue;
            };

            if Constraint::is_self_version(&constraint) {
                if VersionComparator::compare(&installed, version) == Some(std::cmp::Ordering::Equal) {
                    continue;
                }
                recommendations.record(TransitiveUpdate {
                    package: required.clone(),
                    requested_by: BTreeSet::from([requester.clone()]),
                    constraint: constraint.clone(),
                    installed_version: installed.clone(),
                    suggested_version: version.to_string(),
                });
                conflicts.push(RequirementConflict {
                    package: required,
                    constraint,
                    installed_version: installed,
                    suggested_version: Some(version.to_string()),
                });
                continue;
            }

            if ConstraintEvaluator::satisfies(&installed, &constraint) {
                continue;
            }

            let suggested = self.find_compatible(&required, &constraint);
            if let Some(suggested) = &suggested {
                recommendations.record(TransitiveUpdate {
                    package: required.clone(),
                    requested_by: BTreeSet::from([requester.clone()]),
                    constraint: constraint.clone(),
                    installed_version: installed.clone(),
                    suggested_version: suggested.clone(),
                });
            }
            conflicts.push(RequirementConflict {
                package: required,
                constraint,
                installed_version: installed,
                suggested_version: suggested,
            });
        }

        conflicts
    }

    /// Newest stable release of `package` meeting `constraint`; one level only.
    fn find_compatible(&self, package: &str, constraint: &str) -> Option<String> {
        self.registry
            .stable_versions_descending(package)
            .into_iter()
            .find(|v| ConstraintEvaluator::satisfies(v, constraint))
    }

    /// Newest stable release no newer than `proposed` that every dependent
    /// accepts and whose own requirements hold.
    fn search(
        &self,
        package: &str,
        proposed: &str,
        dependents: &BTreeMap<String, String>,
        recommendations: &mut TransitiveUpdates,
    ) -> Option<String> {
        for candidate in self.registry.stable_versions_descending(package) {
            if VersionComparator::is_newer(&candidate, proposed) {
                continue;
            }

            if !Self::dependent_conflicts(dependents, &candidate).is_empty() {
                continue;
            }

            let mut discovered = TransitiveUpdates::new();
            if self
                .check_requirements(package, &candidate, &mut discovered)
                .is_empty()
            {
                recommendations.merge(discovered);
                return Some(candidate);
            }
            debug!(%package, %candidate, "skipping release with unmet requirements");
        }

        None
    }
}

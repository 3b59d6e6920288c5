use crate::agents::dependency_graph::DependencyGraphReader;
use crate::composer::LockSnapshot;
use crate::constraint::ConstraintEvaluator;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};

pub const DEFAULT_IMPACT_DEPTH: usize = 5;

/// Who would be affected by moving a package to a new version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    /// Dependents whose constraint rejects the new version
    pub direct: BTreeMap<String, String>,
    /// Packages further up the chain that would need re-validation
    pub transitive: Vec<String>,
}

impl ImpactReport {
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.transitive.is_empty()
    }
}

/// Reporting-only walk over dependents; never changes a resolution.
pub struct ImpactAnalyzer<'a> {
    graph: DependencyGraphReader<'a>,
    max_depth: usize,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(snapshot: &'a LockSnapshot) -> Self {
        Self {
            graph: DependencyGraphReader::new(snapshot),
            max_depth: DEFAULT_IMPACT_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn analyze(&self, package: &str, new_version: &str) -> ImpactReport {
        let direct: BTreeMap<String, String> = self
            .graph
            .dependents(package)
            .into_iter()
            .filter(|(_, constraint)| !ConstraintEvaluator::satisfies(new_version, constraint))
            .collect();

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(package.to_ascii_lowercase());
        visited.extend(direct.keys().map(|name| name.to_ascii_lowercase()));

        let mut queue: VecDeque<(String, usize)> =
            direct.keys().map(|name| (name.clone(), 1)).collect();
        let mut transitive = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= self.max_depth {
                continue;
            }

            // A dependent whose own version is unknown cannot be checked
            let Some(current_version) = self.graph.installed_version(&current) else {
                continue;
            };

            for (dependent, constraint) in self.graph.dependents(&current) {
                if visited.contains(&dependent.to_ascii_lowercase()) {
                    continue;
                }
                if !ConstraintEvaluator::satisfies(&current_version, &constraint) {
                    continue;
                }

                visited.insert(dependent.to_ascii_lowercase());
                transitive.push(dependent.clone());
                queue.push_back((dependent, depth + 1));
            }
        }

        ImpactReport { direct, transitive }
    }
}

use crate::constraint::version::normalize;
use crate::registry::{PackageRegistry, RequirementMap};
use std::collections::BTreeMap;

/// Fixed registry contents for exercising the planner without a network.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    releases: BTreeMap<String, Vec<(String, RequirementMap)>>,
    replacements: BTreeMap<String, String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(mut self, name: &str, version: &str, requires: &[(&str, &str)]) -> Self {
        let requires = requires
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.releases
            .entry(name.to_string())
            .or_default()
            .push((version.to_string(), requires));
        self
    }

    pub fn with_versions(mut self, name: &str, versions: &[&str]) -> Self {
        for version in versions {
            self = self.with_release(name, version, &[]);
        }
        self
    }

    pub fn with_replacement(mut self, name: &str, replacement: &str) -> Self {
        self.replacements
            .insert(name.to_string(), replacement.to_string());
        self
    }
}

impl PackageRegistry for InMemoryRegistry {
    fn list_versions(&self, name: &str) -> Vec<String> {
        self.releases
            .get(name)
            .map(|releases| releases.iter().map(|(v, _)| v.clone()).collect())
            .unwrap_or_default()
    }

    fn requirements(&self, name: &str, version: &str) -> RequirementMap {
        let wanted = normalize(version);
        self.releases
            .get(name)
            .and_then(|releases| releases.iter().find(|(v, _)| normalize(v) == wanted))
            .map(|(_, requires)| requires.clone())
            .unwrap_or_default()
    }

    fn replacement(&self, name: &str) -> Option<String> {
        self.replacements.get(name).cloned()
    }
}

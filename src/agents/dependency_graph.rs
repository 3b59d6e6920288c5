use crate::composer::LockSnapshot;
use crate::constraint::Version;
use crate::registry::RequirementMap;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// One "requires" relation read from the lock snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub constraint: String,
    pub dev: bool,
}

/// Read-only view answering "who requires what" over a lock snapshot.
///
/// Nothing is cached between calls: every query walks the snapshot again.
pub struct DependencyGraphReader<'a> {
    snapshot: &'a LockSnapshot,
}

impl<'a> DependencyGraphReader<'a> {
    pub fn new(snapshot: &'a LockSnapshot) -> Self {
        Self { snapshot }
    }

    /// Every edge in the snapshot, mandatory sections before dev sections.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges = Vec::new();
        for package in &self.snapshot.packages {
            let sections: [(&RequirementMap, bool); 2] =
                [(&package.requires, false), (&package.dev_requires, true)];
            for (requires, dev) in sections {
                for (name, constraint) in requires {
                    edges.push(DependencyEdge {
                        from: package.name.clone(),
                        to: name.clone(),
                        constraint: constraint.clone(),
                        dev,
                    });
                }
            }
        }
        edges
    }

    /// Installed packages requiring `package`, with the constraint each declares.
    /// A mandatory requirement wins over a dev requirement from the same dependent.
    pub fn dependents(&self, package: &str) -> BTreeMap<String, String> {
        let mut dependents = BTreeMap::new();
        for edge in self.edges() {
            if !edge.to.eq_ignore_ascii_case(package) || edge.from.eq_ignore_ascii_case(package) {
                continue;
            }
            match dependents.entry(edge.from) {
                Entry::Vacant(slot) => {
                    slot.insert(edge.constraint);
                }
                Entry::Occupied(mut slot) if !edge.dev => {
                    slot.insert(edge.constraint);
                }
                Entry::Occupied(_) => {}
            }
        }
        dependents
    }

    /// Locked version, else a version read off the manifest's declared range.
    pub fn installed_version(&self, package: &str) -> Option<String> {
        if let Some(installed) = self.snapshot.package(package) {
            return Some(installed.version.clone());
        }

        let manifest = &self.snapshot.manifest;
        manifest
            .require
            .iter()
            .chain(manifest.require_dev.iter())
            .find(|(name, _)| name.eq_ignore_ascii_case(package))
            .and_then(|(_, constraint)| version_from_range(constraint))
    }

    /// Requirements the installed copy of `package` declares (mandatory only).
    pub fn installed_requirements(&self, package: &str) -> Option<&'a RequirementMap> {
        self.snapshot.package(package).map(|p| &p.requires)
    }
}

/// `^8.1 || ^9.0` -> `8.1`; `>=2.0,<3` -> `2.0`; `*` -> none.
fn version_from_range(constraint: &str) -> Option<String> {
    let first = constraint
        .split('|')
        .map(str::trim)
        .find(|branch| !branch.is_empty())?;
    let first = first
        .split([',', ' '])
        .map(str::trim)
        .find(|part| !part.is_empty())?;
    let bare = first
        .split('@')
        .next()
        .unwrap_or_default()
        .trim_start_matches(['^', '~', '>', '<', '=', '!', 'v', 'V'])
        .trim_end_matches(".*");

    Version::parse(bare).is_orderable().then(|| bare.to_string())
}

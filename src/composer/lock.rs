use crate::error::{Result, UpkeepError};
use crate::registry::RequirementMap;
use crate::registry::packagist::requirement_map;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An installed package with the requirements it declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    pub requires: RequirementMap,
    pub dev_requires: RequirementMap,
}

impl InstalledPackage {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn requiring(mut self, name: &str, constraint: &str) -> Self {
        self.requires.insert(name.to_string(), constraint.to_string());
        self
    }

    #[cfg(test)]
    pub fn requiring_dev(mut self, name: &str, constraint: &str) -> Self {
        self.dev_requires
            .insert(name.to_string(), constraint.to_string());
        self
    }
}

/// The root project's declared (ranged) requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub require: RequirementMap,
    pub require_dev: RequirementMap,
}

/// Installed state captured once at the start of a planning run.
#[derive(Debug, Clone, Default)]
pub struct LockSnapshot {
    pub packages: Vec<InstalledPackage>,
    pub manifest: Manifest,
}

impl LockSnapshot {
    #[cfg(test)]
    pub fn new(packages: Vec<InstalledPackage>) -> Self {
        Self {
            packages,
            manifest: Manifest::default(),
        }
    }

    #[cfg(test)]
    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn package(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

pub trait LockState {
    /// Current installed state; absent or unreadable state is an empty snapshot.
    fn snapshot(&self) -> LockSnapshot;
}

/// `composer.lock` + `composer.json` in a project directory.
pub struct ComposerLockFile {
    project_path: PathBuf,
}

impl ComposerLockFile {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    pub fn lock_path(&self) -> PathBuf {
        self.project_path.join("composer.lock")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_path.join("composer.json")
    }

    pub fn read_lock(&self) -> Result<Vec<InstalledPackage>> {
        let path = self.lock_path();
        let content = fs::read_to_string(&path)?;
        let lock: LockDocument = serde_json::from_str(&content).map_err(|e| {
            UpkeepError::LockParsing(format!("{}: {}", path.display(), e))
        })?;

        Ok(lock
            .packages
            .into_iter()
            .chain(lock.packages_dev)
            .map(LockedPackage::into_installed)
            .collect())
    }

    pub fn read_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        let content = fs::read_to_string(&path)?;
        let manifest: ManifestDocument = serde_json::from_str(&content).map_err(|e| {
            UpkeepError::LockParsing(format!("{}: {}", path.display(), e))
        })?;

        Ok(Manifest {
            require: requirement_map(&manifest.require),
            require_dev: requirement_map(&manifest.require_dev),
        })
    }
}

impl LockState for ComposerLockFile {
    fn snapshot(&self) -> LockSnapshot {
        let packages = match self.read_lock() {
            Ok(packages) => packages,
            Err(e) => {
                warn!(error = %e, "lock file unavailable, every package will look like a leaf");
                Vec::new()
            }
        };

        let manifest = match self.read_manifest() {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(error = %e, "manifest unavailable");
                Manifest::default()
            }
        };

        debug!(packages = packages.len(), "lock snapshot taken");
        LockSnapshot { packages, manifest }
    }
}

#[derive(Debug, Deserialize)]
struct LockDocument {
    #[serde(default)]
    packages: Vec<LockedPackage>,
    #[serde(default, rename = "packages-dev")]
    packages_dev: Vec<LockedPackage>,
}

#[derive(Debug, Deserialize)]
struct LockedPackage {
    name: String,
    version: String,
    #[serde(default)]
    require: Value,
    #[serde(default, rename = "require-dev")]
    require_dev: Value,
}

impl LockedPackage {
    fn into_installed(self) -> InstalledPackage {
        InstalledPackage {
            requires: requirement_map(&self.require),
            dev_requires: requirement_map(&self.require_dev),
            name: self.name,
            version: self.version,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManifestDocument {
    #[serde(default)]
    require: Value,
    #[serde(default, rename = "require-dev")]
    require_dev: Value,
}

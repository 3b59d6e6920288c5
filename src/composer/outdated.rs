use crate::composer::{LockSnapshot, is_platform_package};
use crate::config::IgnoreList;
use crate::constraint::VersionComparator;
use crate::error::{Result, UpkeepError};
use crate::registry::PackageRegistry;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A direct dependency with a newer version available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutdatedPackage {
    pub name: String,
    pub installed_version: String,
    pub proposed_version: String,
    /// Root manifest constraint, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

impl OutdatedPackage {
    #[cfg(test)]
    pub fn new(
        name: impl Into<String>,
        installed_version: impl Into<String>,
        proposed_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            installed_version: installed_version.into(),
            proposed_version: proposed_version.into(),
            constraint: None,
        }
    }
}

/// Output of `composer outdated --direct --format=json`.
#[derive(Debug, Deserialize)]
struct OutdatedDocument {
    #[serde(default)]
    installed: Vec<OutdatedEntry>,
}

#[derive(Debug, Deserialize)]
struct OutdatedEntry {
    name: String,
    version: String,
    #[serde(default)]
    latest: Option<String>,
    #[serde(default, rename = "latest-status")]
    latest_status: Option<String>,
}

pub struct OutdatedReport;

impl OutdatedReport {
    pub fn from_file<P: AsRef<Path>>(path: P, snapshot: &LockSnapshot) -> Result<Vec<OutdatedPackage>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            UpkeepError::ReportParsing(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content, snapshot)
    }

    pub fn parse(content: &str, snapshot: &LockSnapshot) -> Result<Vec<OutdatedPackage>> {
        let document: OutdatedDocument = serde_json::from_str(content)
            .map_err(|e| UpkeepError::ReportParsing(e.to_string()))?;

        Ok(document
            .installed
            .into_iter()
            .filter(|entry| entry.latest_status.as_deref() != Some("up-to-date"))
            .filter_map(|entry| {
                let latest = entry.latest?;
                if !VersionComparator::is_newer(&latest, &entry.version) {
                    debug!(package = %entry.name, "report entry is not an upgrade, skipping");
                    return None;
                }
                let constraint = manifest_constraint(snapshot, &entry.name);
                Some(OutdatedPackage {
                    name: entry.name,
                    installed_version: entry.version,
                    proposed_version: latest,
                    constraint,
                })
            })
            .collect())
    }
}

fn manifest_constraint(snapshot: &LockSnapshot, name: &str) -> Option<String> {
    snapshot
        .manifest
        .require
        .get(name)
        .or_else(|| snapshot.manifest.require_dev.get(name))
        .cloned()
}

/// Derives the outdated list from the manifest, the lock and the registry.
pub struct OutdatedScanner {
    registry: Arc<dyn PackageRegistry>,
    show_progress: bool,
}

impl OutdatedScanner {
    pub fn new(registry: Arc<dyn PackageRegistry>) -> Self {
        Self {
            registry,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn scan(&self, snapshot: &LockSnapshot, include_dev: bool) -> Vec<OutdatedPackage> {
        let mut direct: Vec<(&String, &String)> = snapshot.manifest.require.iter().collect();
        if include_dev {
            direct.extend(snapshot.manifest.require_dev.iter());
        }
        direct.retain(|(name, _)| !is_platform_package(name));

        let pb = ProgressBar::new(direct.len() as u64);
        if !self.show_progress {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        let mut outdated = Vec::new();
        for (name, constraint) in direct {
            pb.set_message(format!("Checking {}", name));

            let Some(installed) = snapshot.package(name) else {
                debug!(package = %name, "declared but not installed, skipping");
                pb.inc(1);
                continue;
            };

            let latest = self.registry.stable_versions_descending(name).into_iter().next();
            if let Some(latest) = latest {
                if VersionComparator::is_newer(&latest, &installed.version) {
                    outdated.push(OutdatedPackage {
                        name: name.clone(),
                        installed_version: installed.version.clone(),
                        proposed_version: latest,
                        constraint: Some(constraint.clone()),
                    });
                }
            }

            pb.inc(1);
        }
        pb.finish_and_clear();

        outdated
    }
}

/// Drop ignored packages, logging each one.
pub fn apply_ignore_list(outdated: Vec<OutdatedPackage>, ignore: &IgnoreList) -> Vec<OutdatedPackage> {
    outdated
        .into_iter()
        .filter(|p| {
            let ignored = ignore.is_ignored(&p.name);
            if ignored {
                debug!(package = %p.name, "ignored by configuration");
            }
            !ignored
        })
        .collect()
}

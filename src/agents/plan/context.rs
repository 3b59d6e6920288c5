use crate::agents::batch_optimizer::UpdateBatch;
use crate::agents::impact_analyzer::{DEFAULT_IMPACT_DEPTH, ImpactReport};
use crate::agents::version_resolver::{Resolution, TransitiveUpdate};
use crate::composer::LockSnapshot;
use crate::registry::PackageRegistry;
use serde::Serialize;
use std::sync::Arc;

/// Options for one planning run
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Max depth of the transitive impact walk
    pub impact_depth: usize,
    /// Fold transitive recommendations into the batches
    pub merge_transitive: bool,
    /// Draw a progress bar while resolving
    pub show_progress: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            impact_depth: DEFAULT_IMPACT_DEPTH,
            merge_transitive: false,
            show_progress: false,
        }
    }
}

/// Everything a planning run reads, captured once when the run starts
pub struct PlanContext {
    pub registry: Arc<dyn PackageRegistry>,
    pub snapshot: LockSnapshot,
    pub options: PlanOptions,
}

impl PlanContext {
    pub fn new(registry: Arc<dyn PackageRegistry>, snapshot: LockSnapshot) -> Self {
        Self {
            registry,
            snapshot,
            options: PlanOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PlanOptions) -> Self {
        self.options = options;
        self
    }
}

/// Verdict and remediation for one outdated package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageOutcome {
    pub name: String,
    pub installed_version: String,
    pub proposed_version: String,
    pub resolution: Resolution,
    /// Who the proposed version would break
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactReport>,
    /// Newest older release every conflicting dependent accepts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_version: Option<String>,
    /// Replacement package when this one is abandoned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

impl PackageOutcome {
    /// The version this plan will install, when it is an actual upgrade
    pub fn upgrade_version(&self) -> Option<&str> {
        self.resolution
            .version()
            .filter(|v| crate::constraint::VersionComparator::is_newer(v, &self.installed_version))
    }
}

/// Result of a planning run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    pub packages: Vec<PackageOutcome>,
    pub transitive_updates: Vec<TransitiveUpdate>,
    pub batches: Vec<UpdateBatch>,
}

impl PlanReport {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn upgrade_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn blocked(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.packages.iter().filter(|p| p.resolution.version().is_none())
    }
}

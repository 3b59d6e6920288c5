use crate::agents::batch_optimizer::BatchUpdateOptimizer;
use crate::agents::fallback_finder::FallbackVersionFinder;
use crate::agents::impact_analyzer::ImpactAnalyzer;
use crate::agents::plan::{PackageOutcome, PlanContext, PlanReport};
use crate::agents::version_resolver::{Resolution, TransitiveUpdates, VersionResolver};
use crate::composer::OutdatedPackage;
use crate::constraint::VersionComparator;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashSet;
use tracing::{debug, info};

/// UpdatePlanner runs the resolver over every outdated package and turns
/// the accepted versions into ordered batches.
pub struct UpdatePlanner<'a> {
    context: &'a PlanContext,
}

impl<'a> UpdatePlanner<'a> {
    pub fn new(context: &'a PlanContext) -> Self {
        Self { context }
    }

    pub fn plan(&self, outdated: &[OutdatedPackage]) -> PlanReport {
        let registry = self.context.registry.as_ref();
        let snapshot = &self.context.snapshot;
        let resolver = VersionResolver::new(registry, snapshot);
        let analyzer = ImpactAnalyzer::new(snapshot).with_max_depth(self.context.options.impact_depth);
        let finder = FallbackVersionFinder::new(registry);

        let pb = ProgressBar::new(outdated.len() as u64);
        if !self.context.options.show_progress {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        let mut recommendations = TransitiveUpdates::new();
        let mut packages = Vec::with_capacity(outdated.len());

        for candidate in outdated {
            pb.set_message(format!("Resolving {}", candidate.name));

            let resolution =
                resolver.resolve(&candidate.name, &candidate.proposed_version, &mut recommendations);

            let mut outcome = PackageOutcome {
                name: candidate.name.clone(),
                installed_version: candidate.installed_version.clone(),
                proposed_version: candidate.proposed_version.clone(),
                resolution,
                impact: None,
                fallback_version: None,
                alternative: None,
            };

            let conflicts = outcome.resolution.dependent_conflicts();
            if !conflicts.is_empty() {
                outcome.impact = Some(analyzer.analyze(&candidate.name, &candidate.proposed_version));
                outcome.fallback_version =
                    finder.find(&candidate.name, &candidate.proposed_version, conflicts);
            }
            if matches!(outcome.resolution, Resolution::Unresolvable { .. }) {
                outcome.alternative = registry.replacement(&candidate.name);
            }

            debug!(package = %outcome.name, state = ?outcome.resolution.state(), "resolved");
            packages.push(outcome);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let candidates = self.batch_candidates(&packages, &recommendations);
        let batches = BatchUpdateOptimizer::new(snapshot).optimize(&candidates);
        info!(
            packages = packages.len(),
            upgrades = candidates.len(),
            batches = batches.len(),
            "plan ready"
        );

        PlanReport {
            packages,
            transitive_updates: recommendations.into_vec(),
            batches,
        }
    }

    fn batch_candidates(
        &self,
        packages: &[PackageOutcome],
        recommendations: &TransitiveUpdates,
    ) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();

        for outcome in packages {
            seen.insert(outcome.name.to_ascii_lowercase());
            match outcome.upgrade_version() {
                Some(version) => candidates.push(format!("{}:{}", outcome.name, version)),
                None => debug!(package = %outcome.name, "no upgrade in this plan"),
            }
        }

        if self.context.options.merge_transitive {
            for update in recommendations.iter() {
                if !seen.insert(update.package.to_ascii_lowercase()) {
                    continue;
                }
                if VersionComparator::is_newer(&update.suggested_version, &update.installed_version) {
                    candidates.push(format!("{}:{}", update.package, update.suggested_version));
                }
            }
        }

        candidates
    }
}

pub mod batch_optimizer;
pub mod dependency_graph;
pub mod fallback_finder;
pub mod impact_analyzer;
pub mod project_scanner;
pub mod update_planner;
pub mod version_resolver;

// Per-run state and report types
pub mod plan;
pub use plan::{PackageOutcome, PlanContext, PlanOptions, PlanReport};

pub use impact_analyzer::{ImpactAnalyzer, ImpactReport};
pub use project_scanner::ProjectScannerAgent;
pub use update_planner::UpdatePlanner;
pub use version_resolver::Resolution;

// Plan module - per-run state and the report a planning run produces
//
// - PlanContext: registry, lock snapshot and options for one run
// - PlanReport: per-package outcomes, transitive recommendations and batches
pub mod context;

pub use context::{PackageOutcome, PlanContext, PlanOptions, PlanReport};

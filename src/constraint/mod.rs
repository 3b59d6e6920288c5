pub mod evaluator;
pub mod version;

pub use evaluator::{Constraint, ConstraintEvaluator};
pub use version::{Version, VersionComparator};

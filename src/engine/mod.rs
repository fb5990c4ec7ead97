// ==========================================
// Repooler - Engine Layer
// ==========================================
// Planning rules only; no SQL, no file output
// ==========================================

pub mod aggregator;
pub mod cover;
pub mod dedup;
pub mod distribution;
pub mod error;
pub mod orchestrator;
pub mod rounding;

pub use aggregator::{YieldAggregation, YieldAggregator};
pub use cover::UniqueCoverSelector;
pub use dedup::StructureDeduplicator;
pub use distribution::{Distribution, DistributionPlanner};
pub use error::{PlanError, PlanResult};
pub use orchestrator::RepoolPlanner;
pub use rounding::{PipettingRounder, RoundingOutcome, RoundingParams, RoundingProblem, RoundingState};

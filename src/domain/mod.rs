// ==========================================
// Repooler - Domain Layer
// ==========================================
// Entities and value types; no data access, no engine logic
// ==========================================

pub mod pool_plan;
pub mod structure;
pub mod types;

pub use pool_plan::{PoolPlan, SampleAllocation, StructurePlan};
pub use structure::{StructureKey, StructureMap, UniqueStructure};
pub use types::{
    is_undetermined, LaneId, PlateWell, RemainingClusters, SampleYield, UNDETERMINED,
};

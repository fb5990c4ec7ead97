// ==========================================
// Repooler - Repository Layer
// ==========================================
// No planning logic here; parameterized queries only
// ==========================================

pub mod error;
pub mod location_repo;
pub mod yield_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use location_repo::{SampleLocationDirectory, SampleLocationRecord, SampleLocationRepository};
pub use yield_repo::{LaneYieldRepository, SequencingResultStore};

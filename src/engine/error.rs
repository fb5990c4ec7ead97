// ==========================================
// Repooler - Planning Error Types
// ==========================================
// Tooling: thiserror derive
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// Errors raised while building or emitting a pool plan
#[derive(Error, Debug)]
pub enum PlanError {
    // ===== data availability =====
    #[error("no lane records found for project {project_id}")]
    NoLaneRecords { project_id: String },

    #[error("no source location for sample {sample} in project {project_id}")]
    MissingLocation { project_id: String, sample: String },

    // ===== modeling invariants (bugs, never user input) =====
    #[error("structure cover invariant violated: sample {sample} covered {occurrences} times")]
    CoverInvariant { sample: String, occurrences: usize },

    // ===== physical limits =====
    #[error("pool of {volume_ul:.2} µL for [{structure}] exceeds the well capacity of {capacity_ul:.2} µL")]
    Capacity {
        structure: String,
        volume_ul: f64,
        capacity_ul: f64,
    },

    #[error("rounding for [{structure}] did not converge after adding {extra_lanes} lanes")]
    NonConvergence { structure: String, extra_lanes: u32 },

    #[error("destination plates exhausted after {wells_used} wells")]
    PlateOverflow { wells_used: usize },

    // ===== parameters =====
    #[error("invalid parameter {field}: {message}")]
    InvalidConfig { field: String, message: String },

    // ===== output =====
    #[error("failed to write {path}: {message}")]
    Output { path: String, message: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result alias
pub type PlanResult<T> = Result<T, PlanError>;

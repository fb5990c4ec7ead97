// ==========================================
// Repooler - Core Library
// ==========================================
// Plans top-up sequencing pools for samples that fell short
// of their cluster target on earlier flowcells
// Stack: Rust + SQLite
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain - entities and identifiers
pub mod domain;

// Repository - data access
pub mod repository;

// Engine - planning pipeline
pub mod engine;

// Report - summary text and robot sheet
pub mod report;

// Importer - statistics and location tables
pub mod importer;

// Configuration
pub mod config;

// Database (connection setup, PRAGMAs, schema)
pub mod db;

// Logging
pub mod logging;

// ==========================================
// Re-exports
// ==========================================

pub use config::{ConfigManager, RepoolConfig};

pub use domain::{
    LaneId, PlateWell, PoolPlan, RemainingClusters, SampleAllocation, SampleYield, StructureKey,
    StructurePlan, UniqueStructure,
};

pub use engine::{PlanError, PlanResult, RepoolPlanner};

pub use report::{EmittedReport, ReportEmitter};

pub use repository::{
    LaneYieldRepository, SampleLocationDirectory, SampleLocationRepository, SequencingResultStore,
};

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "repooler";

// ==========================================
// Repooler - Pool Plan Model
// ==========================================
// Output of one planning run: per selected structure, the rounded
// volume ratios, pool volume and lane counts
// ==========================================

use crate::config::RepoolConfig;
use crate::domain::structure::StructureKey;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// SampleAllocation - one sample inside a pool
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleAllocation {
    pub sample_id: String,
    pub observed_clusters: u64,  // summed over every lane of the sample
    pub remaining_clusters: u64, // max(0, target - observed)
    pub desired_ratio: f64,      // share of the structure's remaining need
    pub factor: f64,             // historical output share / equal share
    pub corrected_ratio: f64,    // desired / factor, renormalized
    pub rounded_ratio: f64,      // pipettable ratio
    pub volume_ul: f64,          // rounded_ratio * pool volume
    pub expected_clusters: f64,  // clusters this pool should deliver
}

// ==========================================
// StructurePlan - one pool
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructurePlan {
    pub key: StructureKey,
    pub copies: usize,
    pub needed_clusters: u64,
    pub needed_lanes: u32, // ceil(needed / clusters_per_lane)
    pub ideal_lanes: f64,  // needed / clusters_per_lane
    pub lanes: u32,        // needed_lanes + extra_lanes
    pub extra_lanes: u32,  // added while rounding
    pub pool_volume_ul: f64,
    pub allocations: Vec<SampleAllocation>,
}

impl StructurePlan {
    pub fn rounded_sum(&self) -> f64 {
        self.allocations.iter().map(|a| a.rounded_ratio).sum()
    }

    /// Samples that receive volume, in structure key order
    pub fn pipetted(&self) -> impl Iterator<Item = &SampleAllocation> {
        self.allocations.iter().filter(|a| a.rounded_ratio > 0.0)
    }
}

// ==========================================
// PoolPlan - full result of a run
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolPlan {
    pub run_id: String,
    pub project_id: String,
    pub generated_at: NaiveDateTime,
    pub config: RepoolConfig,
    pub structures: Vec<StructurePlan>,
}

impl PoolPlan {
    pub fn total_lanes(&self) -> u32 {
        self.structures.iter().map(|s| s.lanes).sum()
    }

    pub fn ideal_lanes(&self) -> f64 {
        self.structures.iter().map(|s| s.ideal_lanes).sum()
    }

    pub fn extra_lanes(&self) -> u32 {
        self.structures.iter().map(|s| s.extra_lanes).sum()
    }

    /// Actual lanes over the theoretical minimum; 0 when nothing is needed
    pub fn opt(&self) -> f64 {
        let ideal = self.ideal_lanes();
        if ideal <= 0.0 {
            return 0.0;
        }
        self.total_lanes() as f64 / ideal
    }

    /// Clusters still needed across all pooled samples
    pub fn target_clusters(&self) -> u64 {
        self.structures.iter().map(|s| s.needed_clusters).sum()
    }

    /// Clusters the pools are expected to deliver to needed samples
    pub fn achieved_clusters(&self) -> f64 {
        self.structures
            .iter()
            .flat_map(|s| s.allocations.iter())
            .filter(|a| a.remaining_clusters > 0)
            .map(|a| a.expected_clusters)
            .sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

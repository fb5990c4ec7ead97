// ==========================================
// Repooler - Domain Types
// ==========================================
// Sample, lane and plate identifiers shared by every layer
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pseudo-sample holding reads that matched no known index
pub const UNDETERMINED: &str = "Undetermined";

/// Returns true for the per-lane `Undetermined` pseudo-sample
pub fn is_undetermined(sample: &str) -> bool {
    sample == UNDETERMINED
}

// ==========================================
// SampleYield - observed clusters of one sample in one lane
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleYield {
    pub sample_id: String,   // sample name as reported by demultiplexing
    pub lane_id: String,     // lane number within the flowcell
    pub flowcell_id: String, // flowcell barcode
    pub clusters: u64,       // read clusters (pass filter)
}

impl SampleYield {
    pub fn new(flowcell_id: &str, lane_id: &str, sample_id: &str, clusters: u64) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            lane_id: lane_id.to_string(),
            flowcell_id: flowcell_id.to_string(),
            clusters,
        }
    }

    pub fn lane(&self) -> LaneId {
        LaneId::new(&self.flowcell_id, &self.lane_id)
    }
}

// ==========================================
// LaneId - physical lane (flowcell + lane number)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneId {
    pub flowcell_id: String,
    pub lane_id: String,
}

impl LaneId {
    pub fn new(flowcell_id: &str, lane_id: &str) -> Self {
        Self {
            flowcell_id: flowcell_id.to_string(),
            lane_id: lane_id.to_string(),
        }
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.flowcell_id, self.lane_id)
    }
}

// ==========================================
// RemainingClusters - clusters each sample still needs
// ==========================================
// Always floored at zero; unknown samples need nothing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingClusters {
    needs: BTreeMap<String, u64>,
}

impl RemainingClusters {
    /// Builds the need table from observed totals: `max(0, target - total)`
    pub fn from_totals(target_clusters: u64, totals: &BTreeMap<String, u64>) -> Self {
        let needs = totals
            .iter()
            .map(|(sample, total)| (sample.clone(), target_clusters.saturating_sub(*total)))
            .collect();
        Self { needs }
    }

    pub fn get(&self, sample: &str) -> u64 {
        self.needs.get(sample).copied().unwrap_or(0)
    }

    pub fn needs_more(&self, sample: &str) -> bool {
        self.get(sample) > 0
    }

    /// Samples with a positive remaining need, in name order
    pub fn needed_samples(&self) -> impl Iterator<Item = &str> {
        self.needs
            .iter()
            .filter(|(_, need)| **need > 0)
            .map(|(sample, _)| sample.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.needs.iter().map(|(sample, need)| (sample.as_str(), *need))
    }

    pub fn len(&self) -> usize {
        self.needs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.needs.is_empty()
    }
}

// ==========================================
// PlateWell - position of a sample on a plate
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateWell {
    pub plate_id: String,
    pub well: String, // `{Letter}:{Number}`, e.g. `B:3`
}

impl PlateWell {
    pub fn new(plate_id: &str, well: &str) -> Self {
        Self {
            plate_id: plate_id.to_string(),
            well: well.to_string(),
        }
    }
}

impl fmt::Display for PlateWell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.plate_id, self.well)
    }
}

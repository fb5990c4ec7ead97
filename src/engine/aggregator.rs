// ==========================================
// Repooler - Yield Aggregator
// ==========================================
// Input: raw lane yields + project id + target clusters
// Output: per-lane sample yields, observed totals, remaining need
// ==========================================

use crate::domain::types::{is_undetermined, LaneId, RemainingClusters, SampleYield};
use crate::engine::error::{PlanError, PlanResult};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Sample -> clusters within one lane
pub type LaneSamples = BTreeMap<String, u64>;

// ==========================================
// YieldAggregation
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct YieldAggregation {
    pub lanes: BTreeMap<LaneId, LaneSamples>,
    pub observed: BTreeMap<String, u64>,
    pub remaining: RemainingClusters,
}

// ==========================================
// YieldAggregator
// ==========================================
pub struct YieldAggregator {
    target_clusters: u64,
}

impl YieldAggregator {
    pub fn new(target_clusters: u64) -> Self {
        Self { target_clusters }
    }

    /// Groups yields by lane and computes remaining need
    ///
    /// Samples of the project keep their real yield. Every other sample
    /// sharing the lane (Undetermined included) is booked at
    /// `target_clusters`, so it never needs more sequencing. Lanes
    /// without any sample of the project are dropped.
    ///
    /// # Errors
    /// `PlanError::NoLaneRecords` when no lane holds a project sample
    #[instrument(skip(self, yields), fields(rows = yields.len()))]
    pub fn aggregate(&self, project_id: &str, yields: &[SampleYield]) -> PlanResult<YieldAggregation> {
        let mut lanes: BTreeMap<LaneId, LaneSamples> = BTreeMap::new();

        for record in yields {
            let lane = lanes.entry(record.lane()).or_default();
            let slot = lane.entry(record.sample_id.clone()).or_insert(0);
            if belongs_to(project_id, &record.sample_id) {
                // a sample split over several index rows in one lane
                *slot = slot.saturating_add(record.clusters);
            } else {
                *slot = self.target_clusters;
            }
        }

        let before = lanes.len();
        lanes.retain(|lane, samples| {
            let keep = samples.keys().any(|s| belongs_to(project_id, s));
            if !keep {
                debug!(%lane, "lane has no sample of the project, dropped");
            }
            keep
        });

        if lanes.is_empty() {
            return Err(PlanError::NoLaneRecords {
                project_id: project_id.to_string(),
            });
        }

        let mut observed: BTreeMap<String, u64> = BTreeMap::new();
        for samples in lanes.values() {
            for (sample, clusters) in samples {
                let total = observed.entry(sample.clone()).or_insert(0);
                *total = total.saturating_add(*clusters);
            }
        }

        let remaining = RemainingClusters::from_totals(self.target_clusters, &observed);

        info!(
            lanes = lanes.len(),
            dropped_lanes = before - lanes.len(),
            samples = observed.len(),
            needing_more = remaining.needed_samples().count(),
            "yields aggregated"
        );

        Ok(YieldAggregation {
            lanes,
            observed,
            remaining,
        })
    }
}

/// A sample belongs to the project when its name contains the project id
///
/// The Undetermined pseudo-sample never belongs to a project.
pub fn belongs_to(project_id: &str, sample: &str) -> bool {
    !project_id.is_empty() && !is_undetermined(sample) && sample.contains(project_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_need_scenario() {
        let aggregator = YieldAggregator::new(100);
        let yields = vec![
            SampleYield::new("FC1", "1", "P1_A", 40),
            SampleYield::new("FC1", "1", "P1_B", 90),
            SampleYield::new("FC1", "1", "Undetermined", 7),
        ];

        let agg = aggregator.aggregate("P1", &yields).unwrap();

        assert_eq!(agg.remaining.get("P1_A"), 60);
        assert_eq!(agg.remaining.get("P1_B"), 10);
        assert_eq!(agg.remaining.get("Undetermined"), 0);
        assert_eq!(agg.observed["Undetermined"], 100);
    }

    #[test]
    fn test_totals_accumulate_across_lanes() {
        let aggregator = YieldAggregator::new(100);
        let yields = vec![
            SampleYield::new("FC1", "1", "P1_A", 30),
            SampleYield::new("FC2", "3", "P1_A", 30),
            SampleYield::new("FC2", "3", "P7_X", 5),
        ];

        let agg = aggregator.aggregate("P1", &yields).unwrap();

        assert_eq!(agg.lanes.len(), 2);
        assert_eq!(agg.observed["P1_A"], 60);
        assert_eq!(agg.remaining.get("P1_A"), 40);
        // other project's sample is booked at target and needs nothing
        assert_eq!(agg.lanes[&LaneId::new("FC2", "3")]["P7_X"], 100);
        assert!(!agg.remaining.needs_more("P7_X"));
    }

    #[test]
    fn test_lanes_without_project_samples_dropped() {
        let aggregator = YieldAggregator::new(100);
        let yields = vec![
            SampleYield::new("FC1", "1", "P1_A", 30),
            SampleYield::new("FC1", "2", "P7_X", 50),
        ];

        let agg = aggregator.aggregate("P1", &yields).unwrap();
        assert_eq!(agg.lanes.len(), 1);
        assert!(!agg.observed.contains_key("P7_X"));
    }

    #[test]
    fn test_no_records_is_lookup_error() {
        let aggregator = YieldAggregator::new(100);
        let result = aggregator.aggregate("P1", &[]);
        assert!(matches!(result, Err(PlanError::NoLaneRecords { .. })));
    }

    #[test]
    fn test_input_not_mutated_and_need_never_negative() {
        let aggregator = YieldAggregator::new(100);
        let yields = vec![
            SampleYield::new("FC1", "1", "P1_A", 400),
            SampleYield::new("FC1", "1", "P1_B", 0),
        ];
        let snapshot = yields.clone();

        let agg = aggregator.aggregate("P1", &yields).unwrap();

        assert_eq!(yields, snapshot);
        assert_eq!(agg.remaining.get("P1_A"), 0);
        assert_eq!(agg.remaining.get("P1_B"), 100);
    }

    #[test]
    fn test_undetermined_is_never_a_project_sample() {
        assert!(!belongs_to("der", "Undetermined"));
        assert!(belongs_to("der", "Lavender_01"));

        let aggregator = YieldAggregator::new(100);
        let yields = vec![
            SampleYield::new("FC1", "1", "Lavender_01", 30),
            SampleYield::new("FC1", "1", "Undetermined", 4),
            SampleYield::new("FC1", "2", "P7_X", 50),
            SampleYield::new("FC1", "2", "Undetermined", 9),
        ];

        let agg = aggregator.aggregate("der", &yields).unwrap();

        // lane 2 only matched through Undetermined
        assert_eq!(agg.lanes.len(), 1);
        assert_eq!(agg.remaining.get("Lavender_01"), 70);
        assert_eq!(agg.observed["Undetermined"], 100);
        assert!(!agg.remaining.needs_more("Undetermined"));
    }
}

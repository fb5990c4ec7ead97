// ==========================================
// Repooler - Planning Orchestrator
// ==========================================
// Aggregate -> deduplicate -> select cover -> distribute -> round
// Pure with respect to the fetched yield snapshot
// ==========================================

use crate::config::RepoolConfig;
use crate::domain::pool_plan::{PoolPlan, SampleAllocation, StructurePlan};
use crate::domain::structure::UniqueStructure;
use crate::domain::types::{RemainingClusters, SampleYield};
use crate::engine::aggregator::{YieldAggregation, YieldAggregator};
use crate::engine::cover::UniqueCoverSelector;
use crate::engine::dedup::StructureDeduplicator;
use crate::engine::distribution::DistributionPlanner;
use crate::engine::error::PlanResult;
use crate::engine::rounding::{PipettingRounder, RoundingParams, RoundingProblem};
use crate::repository::SequencingResultStore;
use chrono::Local;
use std::collections::BTreeMap;
use tracing::{info, instrument};
use uuid::Uuid;

// ==========================================
// RepoolPlanner
// ==========================================
pub struct RepoolPlanner {
    config: RepoolConfig,
}

impl RepoolPlanner {
    /// Validates the parameters up front
    pub fn new(config: RepoolConfig) -> PlanResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RepoolConfig {
        &self.config
    }

    /// Fetches the yield snapshot once and plans from it
    pub fn plan_from_store<S: SequencingResultStore + ?Sized>(
        &self,
        store: &S,
        project_id: &str,
    ) -> PlanResult<PoolPlan> {
        let yields = store.lane_yields(project_id)?;
        self.plan(project_id, &yields)
    }

    #[instrument(skip(self, yields), fields(rows = yields.len()))]
    pub fn plan(&self, project_id: &str, yields: &[SampleYield]) -> PlanResult<PoolPlan> {
        let aggregation =
            YieldAggregator::new(self.config.target_clusters).aggregate(project_id, yields)?;
        let structures = StructureDeduplicator::new().deduplicate(&aggregation.lanes);
        let selected = UniqueCoverSelector::new().select(&structures, &aggregation.remaining)?;

        let plans = selected
            .into_iter()
            .map(|structure| self.plan_structure(structure, &aggregation))
            .collect::<PlanResult<Vec<_>>>()?;

        let plan = PoolPlan {
            run_id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            generated_at: Local::now().naive_local(),
            config: self.config.clone(),
            structures: plans,
        };

        info!(
            run_id = %plan.run_id,
            pools = plan.structures.len(),
            lanes = plan.total_lanes(),
            extra_lanes = plan.extra_lanes(),
            opt = plan.opt(),
            "pool plan ready"
        );
        Ok(plan)
    }

    /// Distribution and rounding for one selected structure
    pub fn plan_structure(
        &self,
        structure: &UniqueStructure,
        aggregation: &YieldAggregation,
    ) -> PlanResult<StructurePlan> {
        plan_structure(&self.config, structure, &aggregation.remaining, &aggregation.observed)
    }
}

/// Distribution planner + rounder on an unchanged
/// `(structure, remaining need, lane count)` input
pub fn plan_structure(
    config: &RepoolConfig,
    structure: &UniqueStructure,
    remaining: &RemainingClusters,
    observed: &BTreeMap<String, u64>,
) -> PlanResult<StructurePlan> {
    let distribution = DistributionPlanner::new(config.clusters_per_lane).plan(structure, remaining);

    let label = structure.key.to_string();
    let rounder = PipettingRounder::new(RoundingParams::from(config));
    let outcome = rounder.round(&RoundingProblem {
        label: &label,
        ratios: &distribution.corrected,
        factors: &distribution.factors,
        needs: &distribution.needs,
        initial_lanes: distribution.needed_lanes,
    })?;

    let expected = rounder.expected_clusters(&outcome.rounded, &distribution.factors, outcome.lanes);

    let allocations = structure
        .samples()
        .iter()
        .enumerate()
        .map(|(i, sample)| SampleAllocation {
            sample_id: sample.clone(),
            observed_clusters: observed.get(sample).copied().unwrap_or(0),
            remaining_clusters: distribution.needs[i],
            desired_ratio: distribution.desired[i],
            factor: distribution.factors[i],
            corrected_ratio: distribution.corrected[i],
            rounded_ratio: outcome.rounded[i],
            volume_ul: outcome.rounded[i] * outcome.pool_volume_ul,
            expected_clusters: expected[i],
        })
        .collect();

    Ok(StructurePlan {
        key: structure.key.clone(),
        copies: structure.copies,
        needed_clusters: distribution.needed_clusters,
        needed_lanes: distribution.needed_lanes,
        ideal_lanes: distribution.ideal_lanes,
        lanes: outcome.lanes,
        extra_lanes: outcome.extra_lanes,
        pool_volume_ul: outcome.pool_volume_ul,
        allocations,
    })
}

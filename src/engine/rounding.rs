// ==========================================
// Repooler - Pipetting-Constrained Rounder
// ==========================================
// Rounds volume ratios to what the robot can pipette. When the
// rounded ratios overflow the pool and nothing can be trimmed, one
// lane is added and rounding restarts.
// ==========================================
// States: Rounding -> (Rounding | LaneIncrement | Converged)
//         LaneIncrement -> Rounding
// ==========================================

use crate::config::RepoolConfig;
use crate::engine::error::{PlanError, PlanResult};
use tracing::{debug, info, warn};

/// Tolerance on `Σ ratios <= 1`
pub const RATIO_EPSILON: f64 = 1e-9;

/// Smallest volume step the robot can add (µL)
pub const PIPETTE_RESOLUTION_UL: f64 = 0.1;

/// Hard guard on transitions for one structure
const MAX_TRANSITIONS: usize = 1_000_000;

// ==========================================
// RoundingParams
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RoundingParams {
    pub lane_volume_ul: f64,
    pub pool_excess_ul: f64,
    pub min_pipette_ul: f64,
    pub clusters_per_lane: u64,
    pub well_capacity_ul: f64,
    pub max_extra_lanes: u32,
}

impl From<&RepoolConfig> for RoundingParams {
    fn from(config: &RepoolConfig) -> Self {
        Self {
            lane_volume_ul: config.lane_volume_ul,
            pool_excess_ul: config.pool_excess_ul,
            min_pipette_ul: config.min_pipette_ul,
            clusters_per_lane: config.clusters_per_lane,
            well_capacity_ul: config.well_capacity_ul,
            max_extra_lanes: config.max_extra_lanes,
        }
    }
}

// ==========================================
// RoundingProblem - one structure's unrounded input
// ==========================================
// All slices are in structure key order
#[derive(Debug, Clone, Copy)]
pub struct RoundingProblem<'a> {
    pub label: &'a str,
    pub ratios: &'a [f64],
    pub factors: &'a [f64],
    pub needs: &'a [u64],
    pub initial_lanes: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundingState {
    Rounding { lanes: u32, ratios: Vec<f64> },
    LaneIncrement { lanes: u32 },
    Converged { lanes: u32, ratios: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundingOutcome {
    pub rounded: Vec<f64>,
    pub lanes: u32,
    pub extra_lanes: u32,
    pub pool_volume_ul: f64,
}

// ==========================================
// PipettingRounder
// ==========================================
pub struct PipettingRounder {
    params: RoundingParams,
}

impl PipettingRounder {
    pub fn new(params: RoundingParams) -> Self {
        Self { params }
    }

    pub fn pool_volume_ul(&self, lanes: u32) -> f64 {
        self.params.lane_volume_ul * lanes as f64 + self.params.pool_excess_ul
    }

    /// Highest lane count rounding may reach for a structure
    ///
    /// Lanes needed to give every pipetted sample `min_pipette_ul`
    /// (never below the starting lanes), plus `max_extra_lanes`.
    pub fn lane_ceiling(&self, problem: &RoundingProblem<'_>) -> u32 {
        let pipetted = problem.ratios.iter().filter(|r| **r > 0.0).count() as f64;
        let floor = (pipetted * self.params.min_pipette_ul / self.params.lane_volume_ul).ceil();
        let floor = if floor.is_finite() && floor < u32::MAX as f64 {
            floor as u32
        } else {
            u32::MAX
        };
        floor
            .max(problem.initial_lanes)
            .saturating_add(self.params.max_extra_lanes)
    }

    /// (min_tres, min_add) as fractions of the pool
    pub fn thresholds(&self, lanes: u32) -> (f64, f64) {
        let pool = self.pool_volume_ul(lanes);
        (
            self.params.min_pipette_ul / pool,
            PIPETTE_RESOLUTION_UL / pool,
        )
    }

    /// Nonzero ratios below min_tres become min_tres; the rest are
    /// floored to a multiple of min_add (never below min_tres)
    pub fn initial_round(&self, ratios: &[f64], lanes: u32) -> Vec<f64> {
        let (min_tres, min_add) = self.thresholds(lanes);
        ratios
            .iter()
            .map(|r| {
                if *r <= 0.0 {
                    0.0
                } else if *r < min_tres {
                    min_tres
                } else {
                    let floored = ((r / min_add) + RATIO_EPSILON).floor() * min_add;
                    floored.max(min_tres)
                }
            })
            .collect()
    }

    /// Clusters sample `index` receives at this allocation
    fn realized(&self, ratios: &[f64], factors: &[f64], lanes: u32, index: usize) -> f64 {
        let weight: f64 = ratios.iter().zip(factors).map(|(r, f)| r * f).sum();
        if weight <= 0.0 {
            return 0.0;
        }
        let lane_clusters = lanes as f64 * self.params.clusters_per_lane as f64;
        lane_clusters * ratios[index] * factors[index] / weight
    }

    /// Expected clusters per sample for the final allocation
    pub fn expected_clusters(&self, ratios: &[f64], factors: &[f64], lanes: u32) -> Vec<f64> {
        (0..ratios.len())
            .map(|i| self.realized(ratios, factors, lanes, i))
            .collect()
    }

    fn check_capacity(&self, problem: &RoundingProblem<'_>, lanes: u32) -> PlanResult<()> {
        let volume = self.pool_volume_ul(lanes);
        if volume > self.params.well_capacity_ul {
            warn!(
                structure = problem.label,
                lanes,
                volume_ul = volume,
                capacity_ul = self.params.well_capacity_ul,
                "pool does not fit in one well"
            );
            return Err(PlanError::Capacity {
                structure: problem.label.to_string(),
                volume_ul: volume,
                capacity_ul: self.params.well_capacity_ul,
            });
        }
        Ok(())
    }

    /// Entry state for a structure
    pub fn start(&self, problem: &RoundingProblem<'_>) -> PlanResult<RoundingState> {
        self.check_capacity(problem, problem.initial_lanes)?;
        Ok(RoundingState::Rounding {
            lanes: problem.initial_lanes,
            ratios: self.initial_round(problem.ratios, problem.initial_lanes),
        })
    }

    /// One step of the state machine
    pub fn transition(
        &self,
        problem: &RoundingProblem<'_>,
        state: RoundingState,
    ) -> PlanResult<RoundingState> {
        match state {
            RoundingState::Rounding { lanes, mut ratios } => {
                let sum: f64 = ratios.iter().sum();
                if sum <= 1.0 + RATIO_EPSILON {
                    return Ok(RoundingState::Converged { lanes, ratios });
                }

                match self.trim_candidate(problem, &ratios, lanes) {
                    Some(index) => {
                        let (_, min_add) = self.thresholds(lanes);
                        ratios[index] -= min_add;
                        Ok(RoundingState::Rounding { lanes, ratios })
                    }
                    None => {
                        debug!(structure = problem.label, lanes, sum, "rounding stuck");
                        Ok(RoundingState::LaneIncrement { lanes })
                    }
                }
            }
            RoundingState::LaneIncrement { lanes } => {
                let extra = lanes.saturating_sub(problem.initial_lanes);
                let ceiling = self.lane_ceiling(problem);
                if lanes >= ceiling {
                    warn!(
                        structure = problem.label,
                        extra_lanes = extra,
                        ceiling,
                        "rounding did not converge"
                    );
                    return Err(PlanError::NonConvergence {
                        structure: problem.label.to_string(),
                        extra_lanes: extra,
                    });
                }
                let lanes = lanes + 1;
                self.check_capacity(problem, lanes)?;
                info!(structure = problem.label, lanes, "lane added to satisfy pipetting limits");
                Ok(RoundingState::Rounding {
                    lanes,
                    ratios: self.initial_round(problem.ratios, lanes),
                })
            }
            converged @ RoundingState::Converged { .. } => Ok(converged),
        }
    }

    /// Sample with the greatest over-expression that can lose one
    /// min_add step without dropping under min_tres or under its need
    fn trim_candidate(
        &self,
        problem: &RoundingProblem<'_>,
        ratios: &[f64],
        lanes: u32,
    ) -> Option<usize> {
        let (min_tres, min_add) = self.thresholds(lanes);
        let mut trial = ratios.to_vec();

        (0..ratios.len())
            .filter(|&i| ratios[i] > 0.0 && ratios[i] - min_add >= min_tres - RATIO_EPSILON)
            .filter(|&i| {
                trial[i] = ratios[i] - min_add;
                let after = self.realized(&trial, problem.factors, lanes, i);
                trial[i] = ratios[i];
                after >= problem.needs[i] as f64
            })
            .map(|i| {
                let over = self.realized(ratios, problem.factors, lanes, i) - problem.needs[i] as f64;
                (i, over)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(i, _)| i)
    }

    /// Runs the state machine to convergence
    pub fn round(&self, problem: &RoundingProblem<'_>) -> PlanResult<RoundingOutcome> {
        let mut state = self.start(problem)?;

        for _ in 0..MAX_TRANSITIONS {
            if let RoundingState::Converged { lanes, ratios } = state {
                let outcome = RoundingOutcome {
                    rounded: ratios,
                    lanes,
                    extra_lanes: lanes - problem.initial_lanes,
                    pool_volume_ul: self.pool_volume_ul(lanes),
                };
                debug!(
                    structure = problem.label,
                    lanes = outcome.lanes,
                    extra_lanes = outcome.extra_lanes,
                    "rounding converged"
                );
                return Ok(outcome);
            }
            state = self.transition(problem, state)?;
        }

        Err(PlanError::NonConvergence {
            structure: problem.label.to_string(),
            extra_lanes: match state {
                RoundingState::Rounding { lanes, .. }
                | RoundingState::LaneIncrement { lanes }
                | RoundingState::Converged { lanes, .. } => {
                    lanes.saturating_sub(problem.initial_lanes)
                }
            },
        })
    }
}

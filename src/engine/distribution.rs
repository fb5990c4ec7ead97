// ==========================================
// Repooler - Distribution Planner
// ==========================================
// Input: selected structure + remaining need + clusters per lane
// Output: lane counts and concentration-corrected volume ratios
// ==========================================

use crate::domain::structure::UniqueStructure;
use crate::domain::types::{is_undetermined, RemainingClusters};
use tracing::{debug, instrument};

// ==========================================
// Distribution - per-structure ratios (structure key order)
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub needs: Vec<u64>,
    pub needed_clusters: u64,
    pub needed_lanes: u32,
    pub ideal_lanes: f64,
    pub desired: Vec<f64>,
    pub factors: Vec<f64>,
    pub corrected: Vec<f64>,
}

pub struct DistributionPlanner {
    clusters_per_lane: u64,
}

impl DistributionPlanner {
    pub fn new(clusters_per_lane: u64) -> Self {
        Self { clusters_per_lane }
    }

    #[instrument(skip_all, fields(structure = %structure.key))]
    pub fn plan(&self, structure: &UniqueStructure, remaining: &RemainingClusters) -> Distribution {
        let needs: Vec<u64> = structure
            .samples()
            .iter()
            .map(|s| remaining.get(s))
            .collect();
        let needed_clusters: u64 = needs.iter().sum();

        let needed_lanes = needed_lanes(needed_clusters, self.clusters_per_lane);
        let ideal_lanes = needed_clusters as f64 / self.clusters_per_lane as f64;

        let desired: Vec<f64> = if needed_clusters == 0 {
            vec![0.0; needs.len()]
        } else {
            needs
                .iter()
                .map(|n| *n as f64 / needed_clusters as f64)
                .collect()
        };

        let factors = concentration_factors(structure);
        let corrected = correct_ratios(structure, &desired, &factors);

        debug!(
            needed_clusters,
            needed_lanes,
            ideal_lanes,
            "distribution planned"
        );

        Distribution {
            needs,
            needed_clusters,
            needed_lanes,
            ideal_lanes,
            desired,
            factors,
            corrected,
        }
    }
}

/// `ceil(needed / clusters_per_lane)`
pub fn needed_lanes(needed_clusters: u64, clusters_per_lane: u64) -> u32 {
    let lanes = needed_clusters.div_ceil(clusters_per_lane);
    u32::try_from(lanes).unwrap_or(u32::MAX)
}

/// Historical output share over the equal share each sample should
/// have received
///
/// Shares are taken over the non-Undetermined slots only. Undetermined
/// always gets 0. A zero or non-finite factor (no usable history) is
/// replaced by 1, leaving that sample uncorrected.
pub fn concentration_factors(structure: &UniqueStructure) -> Vec<f64> {
    let real: Vec<bool> = structure
        .samples()
        .iter()
        .map(|s| !is_undetermined(s))
        .collect();
    let n_real = real.iter().filter(|r| **r).count();
    let total: f64 = structure
        .mean_yields
        .iter()
        .zip(&real)
        .filter(|(_, r)| **r)
        .map(|(y, _)| *y)
        .sum();

    structure
        .mean_yields
        .iter()
        .zip(&real)
        .map(|(y, r)| {
            if !*r {
                return 0.0;
            }
            if total <= 0.0 {
                return 1.0;
            }
            let factor = (*y / total) * n_real as f64;
            if factor.is_finite() && factor > 0.0 {
                factor
            } else {
                1.0
            }
        })
        .collect()
}

/// desired / factor, renormalized to sum to 1 (all zero when nothing is needed)
pub fn correct_ratios(structure: &UniqueStructure, desired: &[f64], factors: &[f64]) -> Vec<f64> {
    let raw: Vec<f64> = structure
        .samples()
        .iter()
        .zip(desired.iter().zip(factors))
        .map(|(sample, (d, f))| {
            if is_undetermined(sample) || *f <= 0.0 {
                0.0
            } else {
                d / f
            }
        })
        .collect();

    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|r| r / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::structure::StructureKey;
    use std::collections::BTreeMap;

    fn structure(samples: &[(&str, f64)]) -> UniqueStructure {
        let key = StructureKey::from_samples(samples.iter().map(|(s, _)| *s));
        let mean_yields = key
            .samples()
            .iter()
            .map(|name| {
                samples
                    .iter()
                    .find(|(s, _)| s == name)
                    .map(|(_, y)| *y)
                    .unwrap()
            })
            .collect();
        UniqueStructure {
            key,
            mean_yields,
            copies: 1,
        }
    }

    fn remaining(target: u64, observed: &[(&str, u64)]) -> RemainingClusters {
        let totals: BTreeMap<String, u64> =
            observed.iter().map(|(s, c)| (s.to_string(), *c)).collect();
        RemainingClusters::from_totals(target, &totals)
    }

    #[test]
    fn test_desired_ratio_scenario() {
        let s = structure(&[("A", 40.0), ("B", 90.0), ("Undetermined", 100.0)]);
        let rem = remaining(100, &[("A", 40), ("B", 90), ("Undetermined", 100)]);

        let dist = DistributionPlanner::new(380).plan(&s, &rem);

        // key order: Undetermined, B, A
        assert_eq!(dist.needs, vec![0, 10, 60]);
        assert!((dist.desired[2] - 60.0 / 70.0).abs() < 1e-12);
        assert!((dist.desired[1] - 10.0 / 70.0).abs() < 1e-12);
        assert_eq!(dist.desired[0], 0.0);
        assert!((dist.desired[2] - 0.857).abs() < 1e-3);
        assert!((dist.desired[1] - 0.143).abs() < 1e-3);
    }

    #[test]
    fn test_needed_lanes_rounds_up() {
        assert_eq!(needed_lanes(650_000_000, 380_000_000), 2);
        assert_eq!(needed_lanes(380_000_000, 380_000_000), 1);
        assert_eq!(needed_lanes(0, 380_000_000), 0);
    }

    #[test]
    fn test_correction_favours_weak_samples() {
        // equal need, A historically delivered half of B
        let s = structure(&[("A", 50.0), ("B", 100.0), ("Undetermined", 7.0)]);
        let rem = remaining(200, &[("A", 150), ("B", 150), ("Undetermined", 200)]);

        let dist = DistributionPlanner::new(380).plan(&s, &rem);

        let a = dist.corrected[2];
        let b = dist.corrected[1];
        assert!((a - 2.0 / 3.0).abs() < 1e-12);
        assert!((b - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(dist.factors[0], 0.0);
        assert_eq!(dist.corrected[0], 0.0);
        assert!((dist.corrected.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_history_sample_is_uncorrected() {
        let s = structure(&[("A", 0.0), ("B", 100.0)]);
        let factors = concentration_factors(&s);
        // key order: B, A
        assert_eq!(factors, vec![2.0, 1.0]);
    }

    #[test]
    fn test_nothing_needed_gives_zero_ratios() {
        let s = structure(&[("A", 100.0), ("Undetermined", 100.0)]);
        let rem = remaining(100, &[("A", 100), ("Undetermined", 100)]);

        let dist = DistributionPlanner::new(380).plan(&s, &rem);

        assert_eq!(dist.needed_clusters, 0);
        assert_eq!(dist.needed_lanes, 0);
        assert!(dist.corrected.iter().all(|r| *r == 0.0));
    }
}

// ==========================================
// Repooler - Planning Parameters
// ==========================================
// Defaults < config_kv overrides < explicit command line flags
// ==========================================

use crate::engine::error::PlanError;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_TARGET_CLUSTERS: u64 = 320_000_000;
pub const DEFAULT_CLUSTERS_PER_LANE: u64 = 380_000_000;
pub const DEFAULT_LANE_VOLUME_UL: f64 = 5.0;
pub const DEFAULT_POOL_EXCESS_UL: f64 = 2.0;
pub const DEFAULT_MIN_PIPETTE_UL: f64 = 1.0;
pub const DEFAULT_DEST_PLATE: &str = "Pool_1";

/// Working volume of one well on a 96-well plate
pub const DEFAULT_WELL_CAPACITY_UL: f64 = 200.0;

/// Lanes the rounder may add past the pipetting floor before giving up
pub const DEFAULT_MAX_EXTRA_LANES: u32 = 8;

// ==========================================
// RepoolConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoolConfig {
    pub target_clusters: u64,   // clusters wanted per sample
    pub clusters_per_lane: u64, // expected clusters from one lane
    pub lane_volume_ul: f64,    // pool volume loaded per lane
    pub pool_excess_ul: f64,    // dead volume added to each pool
    pub min_pipette_ul: f64,    // smallest volume the robot can move
    pub dest_plates: Vec<String>,
    pub well_capacity_ul: f64,
    pub max_extra_lanes: u32,
}

impl Default for RepoolConfig {
    fn default() -> Self {
        Self {
            target_clusters: DEFAULT_TARGET_CLUSTERS,
            clusters_per_lane: DEFAULT_CLUSTERS_PER_LANE,
            lane_volume_ul: DEFAULT_LANE_VOLUME_UL,
            pool_excess_ul: DEFAULT_POOL_EXCESS_UL,
            min_pipette_ul: DEFAULT_MIN_PIPETTE_UL,
            dest_plates: vec![DEFAULT_DEST_PLATE.to_string()],
            well_capacity_ul: DEFAULT_WELL_CAPACITY_UL,
            max_extra_lanes: DEFAULT_MAX_EXTRA_LANES,
        }
    }
}

impl RepoolConfig {
    /// Checks every parameter before planning starts
    ///
    /// # Rules
    /// 1. cluster counts are positive
    /// 2. volumes are finite; lane volume and pipette volume are positive
    /// 3. the minimum pipette volume fits in one well
    /// 4. at least one non-blank destination plate
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.target_clusters == 0 {
            return Err(invalid("target_clusters", "must be greater than 0"));
        }
        if self.clusters_per_lane == 0 {
            return Err(invalid("clusters_per_lane", "must be greater than 0"));
        }

        let volumes = [
            ("lane_volume", self.lane_volume_ul, false),
            ("pool_excess", self.pool_excess_ul, true),
            ("min_pipette", self.min_pipette_ul, false),
            ("well_capacity", self.well_capacity_ul, false),
        ];
        for (field, value, zero_ok) in volumes {
            if !value.is_finite() {
                warn!(field, value, "volume parameter is not finite");
                return Err(invalid(field, "must be a finite number"));
            }
            if value < 0.0 || (!zero_ok && value == 0.0) {
                warn!(field, value, "volume parameter out of range");
                return Err(invalid(
                    field,
                    &format!("{} µL is out of range", value),
                ));
            }
        }

        if self.min_pipette_ul > self.well_capacity_ul {
            return Err(invalid(
                "min_pipette",
                &format!(
                    "{} µL exceeds the well capacity of {} µL",
                    self.min_pipette_ul, self.well_capacity_ul
                ),
            ));
        }

        if self.dest_plates.is_empty() || self.dest_plates.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("dest_plate_list", "needs at least one non-blank plate label"));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> PlanError {
    PlanError::InvalidConfig {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RepoolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_clusters, 320_000_000);
        assert_eq!(config.clusters_per_lane, 380_000_000);
        assert_eq!(config.dest_plates, vec!["Pool_1".to_string()]);
    }

    #[test]
    fn test_rejects_zero_pipette_volume() {
        let config = RepoolConfig {
            min_pipette_ul: 0.0,
            ..RepoolConfig::default()
        };
        match config.validate() {
            Err(PlanError::InvalidConfig { field, .. }) => assert_eq!(field, "min_pipette"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_blank_plate() {
        let config = RepoolConfig {
            dest_plates: vec!["Pool_1".to_string(), " ".to_string()],
            ..RepoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_nan_lane_volume() {
        let config = RepoolConfig {
            lane_volume_ul: f64::NAN,
            ..RepoolConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

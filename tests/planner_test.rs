// ==========================================
// RepoolPlanner integration tests
// ==========================================
// Store -> plan with default parameters on a seeded database
// ==========================================

mod test_helpers;

use repooler::config::{config_keys, ConfigManager, RepoolConfig};
use repooler::domain::PoolPlan;
use repooler::engine::{PlanError, RepoolPlanner};
use repooler::repository::LaneYieldRepository;
use test_helpers::{create_test_db, seed_standard_run, seed_yields, PROJECT};

fn planner() -> RepoolPlanner {
    RepoolPlanner::new(RepoolConfig::default()).expect("default config is valid")
}

#[test]
fn test_plan_selects_one_pool_per_lane_structure() {
    repooler::logging::init_test();
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    seed_standard_run(&conn).expect("Failed to seed yields");

    let store = LaneYieldRepository::from_connection(conn);
    let plan = planner().plan_from_store(&store, PROJECT).unwrap();

    assert_eq!(plan.structures.len(), 2);

    // richest structure first: {P1_A, P1_B}
    let first = &plan.structures[0];
    assert!(first.key.contains("P1_A") && first.key.contains("P1_B"));
    assert_eq!(first.needed_clusters, 70_000_000);
    assert_eq!(first.needed_lanes, 1);
    assert_eq!(first.lanes, 1);
    assert_eq!(first.extra_lanes, 0);
    assert!((first.pool_volume_ul - 7.0).abs() < 1e-9);
    assert!(first.rounded_sum() <= 1.0 + 1e-9);

    let volume = |pool: &repooler::StructurePlan, sample: &str| {
        pool.allocations
            .iter()
            .find(|a| a.sample_id == sample)
            .map(|a| a.volume_ul)
            .unwrap()
    };
    assert!((volume(first, "P1_A") - 6.0).abs() < 1e-6);
    assert!((volume(first, "P1_B") - 1.0).abs() < 1e-6);
    assert_eq!(volume(first, "Undetermined"), 0.0);

    // P1_C shares its lane with P2_X, which is booked at the target
    let second = &plan.structures[1];
    assert!(second.key.contains("P1_C") && second.key.contains("P2_X"));
    assert_eq!(second.needed_clusters, 220_000_000);
    assert!((volume(second, "P1_C") - 7.0).abs() < 1e-6);
    assert_eq!(volume(second, "P2_X"), 0.0);

    assert_eq!(plan.total_lanes(), 2);
    assert_eq!(plan.target_clusters(), 290_000_000);
    assert!(plan.opt() > 1.5);
}

#[test]
fn test_every_needed_sample_reaches_target() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    seed_standard_run(&conn).expect("Failed to seed yields");

    let store = LaneYieldRepository::from_connection(conn);
    let plan = planner().plan_from_store(&store, PROJECT).unwrap();

    for alloc in plan.structures.iter().flat_map(|s| s.allocations.iter()) {
        if alloc.remaining_clusters > 0 {
            assert!(
                alloc.expected_clusters >= alloc.remaining_clusters as f64,
                "{} expects {} of {}",
                alloc.sample_id,
                alloc.expected_clusters,
                alloc.remaining_clusters
            );
        }
    }
}

#[test]
fn test_unknown_project_has_no_lane_records() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    seed_standard_run(&conn).expect("Failed to seed yields");

    let store = LaneYieldRepository::from_connection(conn);
    let result = planner().plan_from_store(&store, "P9");

    assert!(matches!(result, Err(PlanError::NoLaneRecords { ref project_id }) if project_id == "P9"));
}

#[test]
fn test_lanes_of_one_structure_are_merged() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    seed_yields(
        &conn,
        &[
            ("FC1", "1", "P1_A", 100_000_000),
            ("FC1", "1", "P1_B", 200_000_000),
            ("FC1", "1", "Undetermined", 10_000_000),
            ("FC2", "4", "P1_A", 120_000_000),
            ("FC2", "4", "P1_B", 180_000_000),
            ("FC2", "4", "Undetermined", 30_000_000),
        ],
    )
    .expect("Failed to seed yields");

    let store = LaneYieldRepository::from_connection(conn);
    let plan = planner().plan_from_store(&store, PROJECT).unwrap();

    // A: 220M observed, B: 380M observed -> only A still needs clusters
    assert_eq!(plan.structures.len(), 1);
    let pool = &plan.structures[0];
    assert_eq!(pool.copies, 2);
    assert_eq!(pool.needed_clusters, 100_000_000);

    let b = pool.allocations.iter().find(|a| a.sample_id == "P1_B").unwrap();
    assert_eq!(b.observed_clusters, 380_000_000);
    assert_eq!(b.remaining_clusters, 0);
    assert_eq!(b.rounded_ratio, 0.0);
}

#[test]
fn test_database_overrides_apply_before_planning() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    seed_standard_run(&conn).expect("Failed to seed yields");

    let manager = ConfigManager::from_connection(conn.clone());
    manager
        .set_config_value(config_keys::TARGET_CLUSTERS, "300000000")
        .unwrap();

    let mut config = RepoolConfig::default();
    assert_eq!(manager.apply_overrides(&mut config).unwrap(), 1);
    assert_eq!(config.target_clusters, 300_000_000);

    let store = LaneYieldRepository::from_connection(conn);
    let plan = RepoolPlanner::new(config)
        .unwrap()
        .plan_from_store(&store, PROJECT)
        .unwrap();

    // A: 40M, B: satisfied, C: 200M
    assert_eq!(plan.target_clusters(), 240_000_000);
}

#[test]
fn test_plans_are_deterministic() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    seed_standard_run(&conn).expect("Failed to seed yields");
    let store = LaneYieldRepository::from_connection(conn);

    let first = planner().plan_from_store(&store, PROJECT).unwrap();
    let second = planner().plan_from_store(&store, PROJECT).unwrap();

    assert_eq!(first.structures, second.structures);
    assert_ne!(first.run_id, second.run_id);
}

#[test]
fn test_plan_json_reloads_same_structures() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    seed_standard_run(&conn).expect("Failed to seed yields");
    let store = LaneYieldRepository::from_connection(conn);
    let plan = planner().plan_from_store(&store, PROJECT).unwrap();

    let json = plan.to_json().unwrap();
    let reloaded: PoolPlan = serde_json::from_str(&json).unwrap();

    assert_eq!(reloaded.run_id, plan.run_id);
    assert_eq!(reloaded.generated_at, plan.generated_at);
    assert_eq!(reloaded.config, plan.config);
    assert_eq!(reloaded.structures.len(), plan.structures.len());
    for (loaded, original) in reloaded.structures.iter().zip(&plan.structures) {
        assert_eq!(loaded.key, original.key);
        assert_eq!(loaded.lanes, original.lanes);
        assert_eq!(loaded.needed_clusters, original.needed_clusters);
        assert!((loaded.pool_volume_ul - original.pool_volume_ul).abs() < 1e-9);
        for (a, b) in loaded.allocations.iter().zip(&original.allocations) {
            assert_eq!(a.sample_id, b.sample_id);
            assert!((a.rounded_ratio - b.rounded_ratio).abs() < 1e-12);
            assert!((a.volume_ul - b.volume_ul).abs() < 1e-9);
        }
    }
}

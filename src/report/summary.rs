// ==========================================
// Repooler - Plan Summary
// ==========================================
// Human-readable report: parameters, one block per pool,
// target vs achieved clusters and the OPT ratio
// ==========================================

use crate::domain::pool_plan::{PoolPlan, StructurePlan};
use crate::report::robot_csv::SkippedPool;
use std::fmt::Write;

/// OPT above this gets a warning line
pub const OPT_WARNING_THRESHOLD: f64 = 1.5;

/// Renders the summary text
///
/// `skipped` lists pools missing from the robot sheet; `sheet_error`
/// carries a failure that prevented the sheet altogether.
pub fn render_summary(
    plan: &PoolPlan,
    project_name: &str,
    skipped: &[SkippedPool],
    sheet_error: Option<&str>,
) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_summary(&mut out, plan, project_name, skipped, sheet_error);
    out
}

fn write_summary(
    out: &mut String,
    plan: &PoolPlan,
    project_name: &str,
    skipped: &[SkippedPool],
    sheet_error: Option<&str>,
) -> std::fmt::Result {
    let config = &plan.config;

    writeln!(out, "Repool summary")?;
    writeln!(out, "==============")?;
    writeln!(out, "Run ID:             {}", plan.run_id)?;
    writeln!(out, "Project:            {} ({})", project_name, plan.project_id)?;
    writeln!(out, "Generated:          {}", plan.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "Target clusters:    {} per sample", config.target_clusters)?;
    writeln!(out, "Clusters per lane:  {}", config.clusters_per_lane)?;
    writeln!(
        out,
        "Volumes (µL):       lane {:.2}, pool excess {:.2}, min pipette {:.2}",
        config.lane_volume_ul, config.pool_excess_ul, config.min_pipette_ul
    )?;
    writeln!(out, "Destination plates: {}", config.dest_plates.join(", "))?;
    writeln!(out)?;

    if plan.structures.is_empty() {
        writeln!(out, "Every sample already reached the target; nothing to repool.")?;
    }

    for (i, pool) in plan.structures.iter().enumerate() {
        write_pool(out, i + 1, pool)?;
    }

    writeln!(out, "Totals")?;
    writeln!(out, "------")?;
    writeln!(out, "Target clusters:    {}", plan.target_clusters())?;
    writeln!(out, "Achieved clusters:  {:.0}", plan.achieved_clusters())?;
    writeln!(
        out,
        "Lanes:              {} used, {:.2} ideal, {} added for pipetting",
        plan.total_lanes(),
        plan.ideal_lanes(),
        plan.extra_lanes()
    )?;
    writeln!(out, "OPT:                {:.2}", plan.opt())?;
    if plan.opt() > OPT_WARNING_THRESHOLD {
        writeln!(
            out,
            "WARNING: OPT {:.2} is above {:.1}; the plan uses far more lanes than needed.",
            plan.opt(),
            OPT_WARNING_THRESHOLD
        )?;
    }

    if !skipped.is_empty() || sheet_error.is_some() {
        writeln!(out)?;
        writeln!(out, "Not in robot sheet")?;
        writeln!(out, "------------------")?;
        for pool in skipped {
            writeln!(out, "[{}]: {}", pool.key, pool.reason)?;
        }
        if let Some(message) = sheet_error {
            writeln!(out, "Robot sheet not written: {}", message)?;
        }
    }

    Ok(())
}

fn write_pool(out: &mut String, number: usize, pool: &StructurePlan) -> std::fmt::Result {
    writeln!(out, "Pool {} ({} lane copies observed)", number, pool.copies)?;
    writeln!(
        out,
        "  Lanes: {} needed, {:.2} ideal, {} used (+{} for pipetting)",
        pool.needed_lanes, pool.ideal_lanes, pool.lanes, pool.extra_lanes
    )?;
    writeln!(out, "  Pool volume: {:.2} µL", pool.pool_volume_ul)?;
    writeln!(
        out,
        "  {:<24} {:>14} {:>14} {:>8} {:>10} {:>14}",
        "Sample", "Observed", "Remaining", "Ratio", "Volume", "Expected"
    )?;
    for alloc in &pool.allocations {
        writeln!(
            out,
            "  {:<24} {:>14} {:>14} {:>8.4} {:>10.2} {:>14.0}",
            alloc.sample_id,
            alloc.observed_clusters,
            alloc.remaining_clusters,
            alloc.rounded_ratio,
            alloc.volume_ul,
            alloc.expected_clusters
        )?;
    }
    writeln!(out)
}

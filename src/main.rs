// ==========================================
// Repooler - Command Line Entry
// ==========================================
// plan | import-yields | import-locations
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repooler::config::{ConfigManager, RepoolConfig};
use repooler::db::{get_default_db_path, open_sqlite_connection};
use repooler::importer::{LocationImporter, YieldImporter};
use repooler::logging;
use repooler::report::ReportEmitter;
use repooler::repository::{LaneYieldRepository, SampleLocationRepository};
use repooler::RepoolPlanner;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Plan top-up pools for samples below their cluster target
#[derive(Parser, Debug)]
#[clap(name = "repooler", version = repooler::VERSION)]
struct Cli {
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Compute the repool for one project and write the summary and robot CSV.
    #[clap(name = "plan")]
    Plan(PlanArgs),

    /// Load demultiplex lane statistics (CSV or Excel) into the database.
    #[clap(name = "import-yields")]
    ImportYields(ImportYieldsArgs),

    /// Load sample plate/well locations (CSV or Excel) into the database.
    #[clap(name = "import-locations")]
    ImportLocations(ImportLocationsArgs),
}

#[derive(Parser, Debug)]
struct DbArgs {
    /// SQLite database path. Defaults to $REPOOLER_DB_PATH or the user data directory.
    #[clap(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Project identifier; samples whose name contains it belong to the project.
    #[clap(value_name = "PROJECT_ID")]
    project_id: String,

    /// Destination plate, in fill order. Repeat for more plates.
    #[clap(long = "dest-plate", value_name = "PLATE")]
    dest_plates: Vec<String>,

    /// Clusters each sample must reach.
    #[clap(long, value_name = "N")]
    target_clusters: Option<u64>,

    /// Clusters one lane delivers.
    #[clap(long, value_name = "N")]
    clusters_per_lane: Option<u64>,

    /// Pool volume per lane, in µL.
    #[clap(long = "lane-volume", value_name = "UL")]
    lane_volume_ul: Option<f64>,

    /// Extra pool volume, in µL.
    #[clap(long = "pool-excess", value_name = "UL")]
    pool_excess_ul: Option<f64>,

    /// Smallest volume the robot can pipette, in µL.
    #[clap(long = "min-pipette", value_name = "UL")]
    min_pipette_ul: Option<f64>,

    #[clap(flatten)]
    db: DbArgs,
}

#[derive(Parser, Debug)]
struct ImportYieldsArgs {
    /// Lane statistics file (.csv, .xlsx, .xls).
    #[clap(value_name = "FILE")]
    file: PathBuf,

    /// Flowcell id for every row; overrides the Flowcell column.
    #[clap(long, value_name = "ID")]
    flowcell: Option<String>,

    #[clap(flatten)]
    db: DbArgs,
}

#[derive(Parser, Debug)]
struct ImportLocationsArgs {
    /// Location table (.csv, .xlsx, .xls).
    #[clap(value_name = "FILE")]
    file: PathBuf,

    #[clap(flatten)]
    db: DbArgs,
}

impl DbArgs {
    fn open(&self) -> Result<Arc<Mutex<Connection>>> {
        let path = match &self.db {
            Some(path) => path.to_string_lossy().to_string(),
            None => get_default_db_path(),
        };
        info!(db = %path, "opening database");
        let conn = open_sqlite_connection(&path)
            .with_context(|| format!("failed to open database {}", path))?;
        Ok(Arc::new(Mutex::new(conn)))
    }
}

impl PlanArgs {
    /// Flags win over stored overrides
    fn apply_to(&self, config: &mut RepoolConfig) {
        if !self.dest_plates.is_empty() {
            config.dest_plates = self.dest_plates.clone();
        }
        if let Some(v) = self.target_clusters {
            config.target_clusters = v;
        }
        if let Some(v) = self.clusters_per_lane {
            config.clusters_per_lane = v;
        }
        if let Some(v) = self.lane_volume_ul {
            config.lane_volume_ul = v;
        }
        if let Some(v) = self.pool_excess_ul {
            config.pool_excess_ul = v;
        }
        if let Some(v) = self.min_pipette_ul {
            config.min_pipette_ul = v;
        }
    }
}

fn run_plan(args: &PlanArgs) -> Result<()> {
    let conn = args.db.open()?;

    let mut config = RepoolConfig::default();
    let overridden = ConfigManager::from_connection(conn.clone()).apply_overrides(&mut config)?;
    args.apply_to(&mut config);
    info!(db_overrides = overridden, config = ?config, "planning parameters");

    let planner = RepoolPlanner::new(config)?;
    let yields = LaneYieldRepository::from_connection(conn.clone());
    let plan = planner.plan_from_store(&yields, &args.project_id)?;

    // reports land in the working directory
    let locations = SampleLocationRepository::from_connection(conn);
    let report = ReportEmitter::new(".").emit(&plan, &locations)?;

    println!("Summary: {}", report.summary_path.display());
    println!("Robot CSV: {}", report.csv_path.display());
    for pool in &report.skipped {
        println!("Not in robot sheet [{}]: {}", pool.key, pool.reason);
    }
    Ok(())
}

fn run_import_yields(args: &ImportYieldsArgs) -> Result<()> {
    let conn = args.db.open()?;
    let repo = LaneYieldRepository::from_connection(conn);
    let summary = YieldImporter::new(&repo)
        .import_file(&args.file, args.flowcell.as_deref())
        .with_context(|| format!("failed to import {}", args.file.display()))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_import_locations(args: &ImportLocationsArgs) -> Result<()> {
    let conn = args.db.open()?;
    let repo = SampleLocationRepository::from_connection(conn);
    let summary = LocationImporter::new(&repo)
        .import_file(&args.file)
        .with_context(|| format!("failed to import {}", args.file.display()))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    info!(version = repooler::VERSION, "repooler starting");

    match &cli.subcmd {
        SubCommand::Plan(args) => run_plan(args),
        SubCommand::ImportYields(args) => run_import_yields(args),
        SubCommand::ImportLocations(args) => run_import_locations(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_accepts_parameter_flags() {
        let cli = Cli::try_parse_from([
            "repooler",
            "plan",
            "P1",
            "--dest-plate",
            "PoolA",
            "--dest-plate",
            "PoolB",
            "--min-pipette",
            "0.5",
        ])
        .unwrap();

        match cli.subcmd {
            SubCommand::Plan(args) => {
                let mut config = RepoolConfig::default();
                args.apply_to(&mut config);
                assert_eq!(args.project_id, "P1");
                assert_eq!(config.dest_plates, vec!["PoolA", "PoolB"]);
                assert_eq!(config.min_pipette_ul, 0.5);
            }
            other => panic!("unexpected subcommand {:?}", other),
        }
    }

    #[test]
    fn test_plan_has_no_output_location_flag() {
        let result = Cli::try_parse_from(["repooler", "plan", "P1", "--out-dir", "/tmp/elsewhere"]);
        assert!(result.is_err());
    }
}

// ==========================================
// Importer integration tests
// ==========================================
// CSV files -> SQLite -> store / directory lookups
// ==========================================

mod test_helpers;

use repooler::domain::PlateWell;
use repooler::importer::{CsvParser, ImportError, LocationImporter, YieldImporter};
use repooler::repository::{
    LaneYieldRepository, SampleLocationDirectory, SampleLocationRepository, SequencingResultStore,
};
use std::io::Write;
use tempfile::{Builder, NamedTempFile};
use test_helpers::create_test_db;

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[test]
fn test_import_yields_with_pf_clusters() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    let repo = LaneYieldRepository::from_connection(conn);
    let file = csv_file(&[
        "Flowcell,Lane,Sample,PF Clusters",
        "HAAA,1,P1_A,\"260,000,000\"",
        "HAAA,1,P1_B,\"310,000,000\"",
        "HAAA,1,Undetermined,\"20,000,000\"",
        "HAAA,2,P2_X,\"300,000,000\"",
    ]);

    let summary = YieldImporter::new(&repo).import_file(file.path(), None).unwrap();

    assert_eq!(summary.total_rows, 4);
    assert_eq!(summary.imported, 4);
    assert!(summary.skipped.is_empty());

    let mut yields = repo.lane_yields("P1").unwrap();
    yields.sort_by(|a, b| a.sample_id.cmp(&b.sample_id));
    let names: Vec<&str> = yields.iter().map(|y| y.sample_id.as_str()).collect();
    // lane 2 holds no P1 sample
    assert_eq!(names, vec!["P1_A", "P1_B", "Undetermined"]);
    assert_eq!(yields[0].clusters, 260_000_000);
    assert_eq!(yields[0].flowcell_id, "HAAA");
}

#[test]
fn test_import_yields_flowcell_override_and_bad_rows() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    let repo = LaneYieldRepository::from_connection(conn);
    let file = csv_file(&[
        "Lane,Sample,Clusters",
        "3,P1_A,1000",
        "3,P1_B,lots",
        "3,,500",
        "3,Undetermined,10",
    ]);

    let summary = YieldImporter::with_parser(&repo, Box::new(CsvParser))
        .import_file(file.path(), Some("HBBB"))
        .unwrap();

    assert_eq!(summary.total_rows, 4);
    assert_eq!(summary.imported, 2);
    let rows: Vec<usize> = summary.skipped.iter().map(|issue| issue.row).collect();
    assert_eq!(rows, vec![3, 4]);

    let yields = repo.lane_yields("P1").unwrap();
    assert!(yields.iter().all(|y| y.flowcell_id == "HBBB" && y.lane_id == "3"));
}

#[test]
fn test_import_yields_requires_cluster_column() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    let repo = LaneYieldRepository::from_connection(conn);
    let file = csv_file(&["Flowcell,Lane,Sample,Reads", "HAAA,1,P1_A,10"]);

    let result = YieldImporter::new(&repo).import_file(file.path(), None);
    assert!(matches!(result, Err(ImportError::MissingColumn(_))));
}

#[test]
fn test_reimport_replaces_lane_rows() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    let repo = LaneYieldRepository::from_connection(conn);
    let importer = YieldImporter::new(&repo);

    importer
        .import_file(csv_file(&["Flowcell,Lane,Sample,Clusters", "HAAA,1,P1_A,10"]).path(), None)
        .unwrap();
    importer
        .import_file(csv_file(&["Flowcell,Lane,Sample,Clusters", "HAAA,1,P1_A,25"]).path(), None)
        .unwrap();

    let yields = repo.lane_yields("P1").unwrap();
    assert_eq!(yields.len(), 1);
    assert_eq!(yields[0].clusters, 25);
}

#[test]
fn test_import_locations_latest_step_wins() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    let repo = SampleLocationRepository::from_connection(conn);
    let file = csv_file(&[
        "Project,Project Name,Sample,Plate,Well,Date",
        "P1,Smith_Lab,P1_A,NORM_1,A:1,2026-01-05",
        "P1,Smith_Lab,P1_A,NORM_2,D:4,2026-01-12",
        "P1,Smith_Lab,P1_B,NORM_1,B:1,20260105",
        "P1,Smith_Lab,P1_C,NORM_1,C:1,not a date",
    ]);

    let summary = LocationImporter::new(&repo).import_file(file.path()).unwrap();

    assert_eq!(summary.imported, 3);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].row, 5);

    assert_eq!(
        repo.locate("P1", "P1_A").unwrap(),
        Some(PlateWell::new("NORM_2", "D:4"))
    );
    assert_eq!(
        repo.locate("P1", "P1_B").unwrap(),
        Some(PlateWell::new("NORM_1", "B:1"))
    );
    assert_eq!(repo.locate("P1", "P1_C").unwrap(), None);
    assert_eq!(repo.project_name("P1").unwrap(), Some("Smith_Lab".to_string()));
}

#[test]
fn test_import_missing_file() {
    let (_tmp, conn) = create_test_db().expect("Failed to create test db");
    let repo = SampleLocationRepository::from_connection(conn);

    let result = LocationImporter::new(&repo).import_file("no_such_locations.csv");
    assert!(matches!(result, Err(ImportError::FileNotFound(_))));
}

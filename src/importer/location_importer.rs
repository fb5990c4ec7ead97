// ==========================================
// Repooler - Sample Location Importer
// ==========================================
// Normalization step outputs -> sample_location rows
// Columns: Project, Sample, Plate, Well, Date [, Project Name]
// ==========================================

use crate::domain::types::PlateWell;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_reader::{field, parse_date, required, sheet_row, ImportSummary, RowIssue};
use crate::importer::file_parser::{FileParser, RawRecord, UniversalFileParser};
use crate::repository::{SampleLocationRecord, SampleLocationRepository};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const PROJECT: &[&str] = &["Project", "Project ID"];
const PROJECT_NAME: &[&str] = &["Project Name"];
const SAMPLE: &[&str] = &["Sample", "Sample ID", "Sample Name"];
const PLATE: &[&str] = &["Plate", "Container"];
const WELL: &[&str] = &["Well", "Position"];
const DATE: &[&str] = &["Date", "Step Date"];

/// Maps one record to a location row
pub fn map_location_record(record: &RawRecord, row: usize) -> ImportResult<SampleLocationRecord> {
    let project_id = required(record, PROJECT, row)?;
    let sample_name = required(record, SAMPLE, row)?;
    let plate = required(record, PLATE, row)?;
    let well = required(record, WELL, row)?;
    let raw_date = required(record, DATE, row)?;
    let step_date = parse_date(raw_date).map_err(|message| ImportError::FieldValueError {
        row,
        field: DATE[0].to_string(),
        message,
    })?;

    Ok(SampleLocationRecord {
        project_id: project_id.to_string(),
        sample_name: sample_name.to_string(),
        location: PlateWell::new(plate, well),
        step_date,
    })
}

// ==========================================
// LocationImporter
// ==========================================
pub struct LocationImporter<'a> {
    repo: &'a SampleLocationRepository,
    parser: Box<dyn FileParser>,
}

impl<'a> LocationImporter<'a> {
    pub fn new(repo: &'a SampleLocationRepository) -> Self {
        Self {
            repo,
            parser: Box::new(UniversalFileParser),
        }
    }

    /// Parses, maps and stores one location table
    ///
    /// A `Project Name` column, when present, registers the name used
    /// for report file names.
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<ImportSummary> {
        let batch_id = Uuid::new_v4().to_string();
        let records = self.parser.parse_to_raw_records(file_path.as_ref())?;

        let mut rows = Vec::with_capacity(records.len());
        let mut project_names: BTreeMap<String, String> = BTreeMap::new();
        let mut skipped = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match map_location_record(record, sheet_row(index)) {
                Ok(row) => {
                    if let Some(name) = field(record, PROJECT_NAME) {
                        project_names.insert(row.project_id.clone(), name.to_string());
                    }
                    rows.push(row);
                }
                Err(e) => {
                    warn!(batch_id = %batch_id, error = %e, "location row skipped");
                    skipped.push(RowIssue::from(e));
                }
            }
        }

        for (project_id, name) in &project_names {
            self.repo.upsert_project(project_id, name)?;
        }
        let imported = self.repo.upsert_batch(&rows)?;

        info!(
            batch_id = %batch_id,
            total = records.len(),
            imported,
            skipped = skipped.len(),
            projects = project_names.len(),
            "sample locations imported"
        );

        Ok(ImportSummary {
            batch_id,
            total_rows: records.len(),
            imported,
            skipped,
        })
    }
}

// ==========================================
// Repooler - Lane Yield Importer
// ==========================================
// Demultiplex lane statistics -> lane_yield rows
// Columns: Flowcell, Lane, Sample, Clusters | PF Clusters
// ==========================================

use crate::domain::types::SampleYield;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_reader::{parse_clusters, required, sheet_row, ImportSummary, RowIssue};
use crate::importer::file_parser::{FileParser, RawRecord, UniversalFileParser};
use crate::repository::LaneYieldRepository;
use std::path::Path;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const FLOWCELL: &[&str] = &["Flowcell", "Flowcell ID", "FCID"];
const LANE: &[&str] = &["Lane"];
const SAMPLE: &[&str] = &["Sample", "Sample ID", "SampleID"];
const CLUSTERS: &[&str] = &["Clusters", "PF Clusters"];

/// Maps one record to a yield row
///
/// `flowcell_override` wins over the Flowcell column; without either
/// the row is rejected.
pub fn map_yield_record(
    record: &RawRecord,
    row: usize,
    flowcell_override: Option<&str>,
) -> ImportResult<SampleYield> {
    let flowcell = match flowcell_override {
        Some(id) => id,
        None => required(record, FLOWCELL, row)?,
    };
    let lane = required(record, LANE, row)?;
    let sample = required(record, SAMPLE, row)?;
    let raw_clusters = required(record, CLUSTERS, row)?;
    let clusters = parse_clusters(raw_clusters).map_err(|message| ImportError::FieldValueError {
        row,
        field: CLUSTERS[0].to_string(),
        message,
    })?;

    Ok(SampleYield::new(flowcell, lane, sample, clusters))
}

// ==========================================
// YieldImporter
// ==========================================
pub struct YieldImporter<'a> {
    repo: &'a LaneYieldRepository,
    parser: Box<dyn FileParser>,
}

impl<'a> YieldImporter<'a> {
    pub fn new(repo: &'a LaneYieldRepository) -> Self {
        Self {
            repo,
            parser: Box::new(UniversalFileParser),
        }
    }

    pub fn with_parser(repo: &'a LaneYieldRepository, parser: Box<dyn FileParser>) -> Self {
        Self { repo, parser }
    }

    /// Parses, maps and stores one statistics file
    ///
    /// Rows that fail mapping are reported in the summary; the rest
    /// are written in a single transaction.
    ///
    /// # Errors
    /// - file errors from the parser
    /// - `ImportError::MissingColumn` when no sample or cluster column exists
    /// - `ImportError::Repository` when the write fails
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        flowcell_override: Option<&str>,
    ) -> ImportResult<ImportSummary> {
        let batch_id = Uuid::new_v4().to_string();
        let records = self.parser.parse_to_raw_records(file_path.as_ref())?;

        if let Some(first) = records.first() {
            for names in [SAMPLE, CLUSTERS, LANE] {
                if !first.keys().any(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n))) {
                    return Err(ImportError::MissingColumn(names.join(" | ")));
                }
            }
        }

        let mut rows = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        for (index, record) in records.iter().enumerate() {
            match map_yield_record(record, sheet_row(index), flowcell_override) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!(batch_id = %batch_id, error = %e, "yield row skipped");
                    skipped.push(RowIssue::from(e));
                }
            }
        }

        let imported = self.repo.upsert_batch(&rows)?;
        info!(
            batch_id = %batch_id,
            total = records.len(),
            imported,
            skipped = skipped.len(),
            flowcells = ?distinct_flowcells(&rows),
            "lane yields imported"
        );

        Ok(ImportSummary {
            batch_id,
            total_rows: records.len(),
            imported,
            skipped,
        })
    }
}

fn distinct_flowcells(rows: &[SampleYield]) -> Vec<&str> {
    let mut ids: Vec<&str> = rows.iter().map(|r| r.flowcell_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

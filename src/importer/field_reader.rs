// ==========================================
// Repooler - Field Reading and Cleaning
// ==========================================
// Header lookup, cluster counts with thousands separators,
// step dates in the common spellings
// ==========================================

use crate::importer::error::ImportError;
use crate::importer::file_parser::RawRecord;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Excel serial day 0
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Row rejected during import
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub message: String,
}

impl From<ImportError> for RowIssue {
    fn from(err: ImportError) -> Self {
        let row = match &err {
            ImportError::FieldValueError { row, .. } => *row,
            _ => 0,
        };
        Self {
            row,
            message: err.to_string(),
        }
    }
}

/// Outcome of one import run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub total_rows: usize,
    pub imported: usize,
    pub skipped: Vec<RowIssue>,
}

/// Spreadsheet row number of a data record (header is row 1)
pub fn sheet_row(index: usize) -> usize {
    index + 2
}

/// First non-empty value among the accepted header spellings
///
/// Header comparison ignores case and surrounding whitespace.
pub fn field<'r>(record: &'r RawRecord, names: &[&str]) -> Option<&'r str> {
    names.iter().find_map(|name| {
        record
            .iter()
            .find(|(header, _)| header.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    })
}

pub fn required<'r>(record: &'r RawRecord, names: &[&str], row: usize) -> Result<&'r str, ImportError> {
    field(record, names).ok_or_else(|| ImportError::FieldValueError {
        row,
        field: names[0].to_string(),
        message: "value is empty".to_string(),
    })
}

/// Cluster count; thousands separators and integral floats accepted
pub fn parse_clusters(value: &str) -> Result<u64, String> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();

    if let Ok(n) = cleaned.parse::<u64>() {
        return Ok(n);
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        Ok(_) => Err(format!("'{}' is not a non-negative whole number", value)),
        Err(_) => Err(format!("'{}' is not a number", value)),
    }
}

/// Step date as YYYY-MM-DD, YYYYMMDD, YYYY/MM/DD or an Excel serial
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();
    // Excel renders datetimes with a time part
    let date_part = value.split([' ', 'T']).next().unwrap_or(value);

    for format in ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Ok(date);
        }
    }

    if let Ok(serial) = value.parse::<f64>() {
        if serial.is_finite() && (1.0..2_958_466.0).contains(&serial) {
            let (y, m, d) = EXCEL_EPOCH;
            if let Some(epoch) = NaiveDate::from_ymd_opt(y, m, d) {
                return Ok(epoch + Duration::days(serial.trunc() as i64));
            }
        }
    }

    Err(format!("'{}' is not a date (expected YYYY-MM-DD)", value))
}

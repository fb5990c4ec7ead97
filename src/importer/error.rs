// ==========================================
// Repooler - Import Error Types
// ==========================================
// Tooling: thiserror derive
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// Errors raised while loading yield or location tables
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== file =====
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file format: {0} (expected .xlsx/.xls/.csv)")]
    UnsupportedFormat(String),

    #[error("failed to read file: {0}")]
    FileReadError(String),

    #[error("Excel parse failed: {0}")]
    ExcelParseError(String),

    #[error("CSV parse failed: {0}")]
    CsvParseError(String),

    // ===== mapping =====
    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("row {row}, field {field}: {message}")]
    FieldValueError {
        row: usize,
        field: String,
        message: String,
    },

    // ===== storage =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result alias
pub type ImportResult<T> = Result<T, ImportError>;

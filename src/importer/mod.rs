// ==========================================
// Repooler - Import Layer
// ==========================================
// Loads demultiplex statistics and normalization outputs
// from Excel or CSV into the SQLite store
// ==========================================

pub mod error;
pub mod field_reader;
pub mod file_parser;
pub mod location_importer;
pub mod yield_importer;

pub use error::{ImportError, ImportResult};
pub use field_reader::{ImportSummary, RowIssue};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRecord, UniversalFileParser};
pub use location_importer::LocationImporter;
pub use yield_importer::YieldImporter;

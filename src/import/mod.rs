//! Bulk Import
//!
//! Loads case reports from CSV exports into the record store:
//! - `CaseCsvImporter`: parses a whole file into `NewCaseRecord`s, then writes them
//! - `ImportProgress`: shared progress of the import currently running
//!
//! Imports run in two phases. Parsing must succeed for the whole file before
//! anything is written; once writing starts, each row is written on its own and
//! a failed row does not stop the rest.

mod csv_import;
mod progress;

pub use csv_import::{
    CaseCsvImporter, ImportReport, ParsedImport, ParsedRow, RowFailure, DEFAULT_DATE_FORMAT,
    DEFAULT_SKIP_ROWS,
};
pub use progress::{ImportProgress, ImportState, ImportStatus};

/// Errors that abort an import before any row is written
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

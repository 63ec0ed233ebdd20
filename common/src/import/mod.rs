// Spreadsheet import of completed works
//
// Structural problems (no file, wrong extension, missing column, unreadable
// file) abort the import. Anything wrong with a single row is recorded as
// "Row <n>: <message>" and the remaining rows are still processed.

pub mod parser;
pub mod reader;

use crate::errors::DatabaseError;
use crate::telemetry;
use async_trait::async_trait;
use parser::{ColumnMap, ParsedRow};
use reader::FileFormat;
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Import errors that reject the whole file
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("File not found")]
    MissingFile,

    #[error("Only .xlsx and .csv files are supported")]
    UnsupportedFormat,

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Error processing file: {0}")]
    Unreadable(String),
}

/// Reasons a single row is skipped
#[derive(Error, Debug)]
pub enum RowError {
    #[error("{0} is required")]
    MissingValue(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid cost: {0}")]
    InvalidCost(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// Outcome of an import that got past the structural checks
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub message: String,
    pub imported_count: usize,
    /// `None` when every row was imported
    ///
    /// Entries read `Row <n>: <message>` where `n` is the data row index
    /// plus 2, so the first row under the header is row 2.
    pub errors: Option<Vec<String>>,
}

impl ImportSummary {
    pub fn new(imported_count: usize, errors: Vec<String>) -> Self {
        Self {
            message: format!("Successfully imported {} records", imported_count),
            imported_count,
            errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }
}

/// Persistence seam for imported rows
///
/// An implementation stores one parsed row atomically: the brand, model,
/// repair types, work record and links are either all written or none are.
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Store one row owned by `owner_id` and return the new work id
    async fn import_row(
        &self,
        owner_id: Uuid,
        row: &ParsedRow,
        default_category_name: &str,
    ) -> Result<Uuid, DatabaseError>;
}

/// Spreadsheet importer over any row store
pub struct Importer<S: ImportStore> {
    store: S,
    default_category_name: String,
}

impl<S: ImportStore> Importer<S> {
    pub fn new(store: S, default_category_name: impl Into<String>) -> Self {
        Self {
            store,
            default_category_name: default_category_name.into(),
        }
    }

    /// Import an uploaded file for `owner_id`
    ///
    /// `file` is the upload's file name and content, `None` when the request
    /// carried no file.
    #[instrument(skip(self, file), fields(owner_id = %owner_id))]
    pub async fn import(
        &self,
        owner_id: Uuid,
        file: Option<(&str, &[u8])>,
    ) -> Result<ImportSummary, ImportError> {
        let started = Instant::now();
        let (file_name, bytes) = file.ok_or(ImportError::MissingFile)?;

        let format = FileFormat::from_file_name(file_name)?;
        let table = reader::read_table(format, bytes)?;
        let columns = ColumnMap::from_table(&table)?;

        info!(
            file_name = %file_name,
            rows = table.rows.len(),
            "Importing works from spreadsheet"
        );

        let mut imported = 0usize;
        let mut errors = Vec::new();

        for row in &table.rows {
            if row.cells.iter().all(|cell| cell.is_empty()) {
                continue;
            }

            let result = match columns.parse_row(row) {
                Ok(parsed) => self
                    .store
                    .import_row(owner_id, &parsed, &self.default_category_name)
                    .await
                    .map_err(RowError::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(work_id) => {
                    imported += 1;
                    tracing::debug!(work_id = %work_id, line = row.line, "Row imported");
                }
                Err(e) => {
                    warn!(line = row.line, error = %e, "Row rejected");
                    errors.push(format!("Row {}: {}", row.line, e));
                }
            }
        }

        telemetry::record_works_imported(imported);
        telemetry::record_import_row_errors(errors.len());
        telemetry::record_import_duration(started.elapsed().as_secs_f64());

        info!(
            imported = imported,
            failed = errors.len(),
            "Spreadsheet import finished"
        );

        Ok(ImportSummary::new(imported, errors))
    }
}

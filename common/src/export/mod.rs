// Work record export to CSV, XLSX and JSON files

pub mod csv;
pub mod excel;
pub mod json;

use crate::models::WorkRecord;
use crate::telemetry;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

/// Column headers shared by the CSV and XLSX exports; the import reads the same names
pub const EXPORT_HEADERS: [&str; 8] = [
    "Date",
    "Brand",
    "Model",
    "Categories",
    "Repair-Types",
    "Cost",
    "Notes",
    "Parts",
];

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    Csv(String),

    #[error("Failed to write Excel workbook: {0}")]
    Excel(String),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Json => "application/json; charset=utf-8",
        }
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
            ExportFormat::Json => "json",
        }
    }
}

/// A rendered export ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Attachment name `works_<YYYYMMDD_HHMM>.<ext>` for the generation time
pub fn export_filename(format: ExportFormat, generated_at: NaiveDateTime) -> String {
    format!(
        "works_{}.{}",
        generated_at.format("%Y%m%d_%H%M"),
        format.extension()
    )
}

/// Render `works` in the requested format
#[instrument(skip(works), fields(count = works.len()))]
pub fn export_works(
    format: ExportFormat,
    works: &[WorkRecord],
    generated_at: NaiveDateTime,
) -> Result<ExportFile, ExportError> {
    let bytes = match format {
        ExportFormat::Csv => csv::write_csv(works)?,
        ExportFormat::Excel => excel::write_workbook(works)?,
        ExportFormat::Json => json::write_json(works)?,
    };

    telemetry::record_works_exported(format.label(), works.len());
    tracing::info!(format = format.label(), count = works.len(), size = bytes.len(), "Works exported");

    Ok(ExportFile {
        filename: export_filename(format, generated_at),
        content_type: format.content_type(),
        bytes,
    })
}

/// Distinct category names in first-appearance order
pub(crate) fn category_names(work: &WorkRecord) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for detail in &work.repair_types {
        let name = detail.category.name.as_str();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

pub(crate) fn repair_type_names(work: &WorkRecord) -> Vec<&str> {
    work.repair_types
        .iter()
        .map(|detail| detail.repair_type.name.as_str())
        .collect()
}

/// Amount with exactly two fraction digits
pub(crate) fn money(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_export_filename() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 42)
            .unwrap();
        assert_eq!(export_filename(ExportFormat::Csv, at), "works_20240305_0907.csv");
        assert_eq!(export_filename(ExportFormat::Excel, at), "works_20240305_0907.xlsx");
        assert_eq!(export_filename(ExportFormat::Json, at), "works_20240305_0907.json");
    }

    #[test]
    fn test_money_pads_fraction() {
        assert_eq!(money(Decimal::from(1500)), "1500.00");
        assert_eq!(money(Decimal::new(12345, 1)), "1234.50");
    }
}

// Tabular file reading for CSV and XLSX uploads

use super::ImportError;
use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::io::Cursor;
use tracing::instrument;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Supported upload formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Detect the format from the uploaded file name, case-insensitively
    pub fn from_file_name(file_name: &str) -> Result<Self, ImportError> {
        let lower = file_name.trim().to_lowercase();
        if lower.ends_with(".csv") {
            Ok(FileFormat::Csv)
        } else if lower.ends_with(".xlsx") {
            Ok(FileFormat::Xlsx)
        } else {
            Err(ImportError::UnsupportedFormat)
        }
    }
}

/// A single spreadsheet cell, reduced to what row parsing needs
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    /// Numeric cell; date cells arrive here as Excel serial numbers
    Number(f64),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Cell rendered as trimmed text, whole numbers without a fraction
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }
}

/// A data row with its 1-based row number, the header being row 1
#[derive(Debug, Clone)]
pub struct TableRow {
    pub line: usize,
    pub cells: Vec<Cell>,
}

impl TableRow {
    pub fn cell(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&Cell::Empty)
    }
}

/// Header row plus data rows of the first sheet or the CSV body
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Position of the header with exactly this name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Read the uploaded bytes into a table
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn read_table(format: FileFormat, bytes: &[u8]) -> Result<Table, ImportError> {
    match format {
        FileFormat::Csv => read_csv(bytes),
        FileFormat::Xlsx => read_xlsx(bytes),
    }
}

fn read_csv(bytes: &[u8]) -> Result<Table, ImportError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(body)
        .map_err(|e| ImportError::Unreadable(format!("file is not valid UTF-8: {}", e)))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Unreadable(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ImportError::Unreadable(e.to_string()))?;
        // Header is row 1; blank lines are not records and multi-line cells count once
        let line = index + 2;
        let cells = record
            .iter()
            .map(|value| {
                if value.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(value.to_string())
                }
            })
            .collect();
        rows.push(TableRow { line, cells });
    }

    Ok(Table { headers, rows })
}

fn read_xlsx(bytes: &[u8]) -> Result<Table, ImportError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(cursor)
        .map_err(|e| ImportError::Unreadable(format!("failed to open workbook: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::Unreadable("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::Unreadable(format!("failed to read sheet: {}", e)))?;

    // Range coordinates are 0-based and start at the first used cell
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

    let mut sheet_rows = range.rows();
    let headers = match sheet_rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| convert_cell(cell).as_text())
            .collect(),
        None => Vec::new(),
    };

    let rows = sheet_rows
        .enumerate()
        .map(|(index, row)| TableRow {
            line: first_row + index + 2,
            cells: row.iter().map(convert_cell).collect(),
        })
        .collect();

    Ok(Table { headers, rows })
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Error(e) => Cell::Text(format!("{:?}", e)),
        Data::Empty => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

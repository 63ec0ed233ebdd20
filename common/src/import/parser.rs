// Row parsing: spreadsheet cells to a complete work row

use super::reader::{Cell, Table, TableRow};
use super::{ImportError, RowError};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

pub const COLUMN_DATE: &str = "Date";
pub const COLUMN_BRAND: &str = "Brand";
pub const COLUMN_MODEL: &str = "Model";
pub const COLUMN_REPAIR_TYPES: &str = "Repair-Types";
pub const COLUMN_COST: &str = "Cost";
pub const COLUMN_NOTES: &str = "Notes";
pub const COLUMN_PARTS: &str = "Parts";

/// Columns that must be present, checked in this order
pub const REQUIRED_COLUMNS: [&str; 5] = [
    COLUMN_DATE,
    COLUMN_BRAND,
    COLUMN_MODEL,
    COLUMN_REPAIR_TYPES,
    COLUMN_COST,
];

/// Largest cost that fits NUMERIC(10, 2)
const MAX_COST_EXCLUSIVE: i64 = 100_000_000;

/// Text layouts accepted in date cells, tried in order
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// A fully validated import row, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub work_date: NaiveDate,
    pub brand: String,
    pub model: String,
    /// Non-empty trimmed names in cell order
    pub repair_types: Vec<String>,
    pub cost: Decimal,
    pub notes: String,
    pub parts_used: String,
}

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    date: usize,
    brand: usize,
    model: usize,
    repair_types: usize,
    cost: usize,
    notes: Option<usize>,
    parts: Option<usize>,
}

impl ColumnMap {
    /// Resolve required and optional columns; the first missing required one aborts
    pub fn from_table(table: &Table) -> Result<Self, ImportError> {
        let required = |name: &str| {
            table
                .column(name)
                .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
        };

        // Resolve in REQUIRED_COLUMNS order so the reported column is stable
        let date = required(REQUIRED_COLUMNS[0])?;
        let brand = required(REQUIRED_COLUMNS[1])?;
        let model = required(REQUIRED_COLUMNS[2])?;
        let repair_types = required(REQUIRED_COLUMNS[3])?;
        let cost = required(REQUIRED_COLUMNS[4])?;

        Ok(Self {
            date,
            brand,
            model,
            repair_types,
            cost,
            notes: table.column(COLUMN_NOTES),
            parts: table.column(COLUMN_PARTS),
        })
    }

    /// Parse every field of one row before anything is written
    pub fn parse_row(&self, row: &TableRow) -> Result<ParsedRow, RowError> {
        let brand = required_text(row.cell(self.brand), COLUMN_BRAND)?;
        let model = required_text(row.cell(self.model), COLUMN_MODEL)?;
        let work_date = parse_date(row.cell(self.date))?;
        let cost = parse_cost(row.cell(self.cost))?;
        let repair_types = split_repair_types(&row.cell(self.repair_types).as_text());

        let optional = |index: Option<usize>| {
            index
                .map(|i| row.cell(i).as_text())
                .unwrap_or_default()
        };

        Ok(ParsedRow {
            work_date,
            brand,
            model,
            repair_types,
            cost,
            notes: optional(self.notes),
            parts_used: optional(self.parts),
        })
    }
}

fn required_text(cell: &Cell, column: &str) -> Result<String, RowError> {
    let text = cell.as_text();
    if text.is_empty() {
        return Err(RowError::MissingValue(column.to_string()));
    }
    Ok(text)
}

/// Split a comma separated list, dropping blanks
pub fn split_repair_types(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Serial of the 1900-02-29 that Excel counts but the calendar lacks
const EXCEL_PHANTOM_LEAP_DAY: f64 = 60.0;

/// Convert an Excel serial day number (1900 date system) to a date
///
/// Serial 1 is 1900-01-01. Serial 60 names the phantom leap day and has no date.
pub fn date_from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial >= 2_958_466.0 {
        return None;
    }
    let days = serial.floor();
    let epoch = if days < EXCEL_PHANTOM_LEAP_DAY {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else if days > EXCEL_PHANTOM_LEAP_DAY {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    } else {
        return None;
    };
    epoch.checked_add_signed(Duration::days(days as i64))
}

pub fn parse_date(cell: &Cell) -> Result<NaiveDate, RowError> {
    match cell {
        Cell::Empty => Err(RowError::MissingValue(COLUMN_DATE.to_string())),
        Cell::Number(serial) => {
            date_from_excel_serial(*serial).ok_or_else(|| RowError::InvalidDate(serial.to_string()))
        }
        Cell::Text(raw) => {
            let text = raw.trim();
            if text.is_empty() {
                return Err(RowError::MissingValue(COLUMN_DATE.to_string()));
            }
            parse_date_text(text).ok_or_else(|| RowError::InvalidDate(text.to_string()))
        }
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

/// Parse a cost cell into a non-negative amount with two fraction digits
pub fn parse_cost(cell: &Cell) -> Result<Decimal, RowError> {
    let amount = match cell {
        Cell::Empty => return Err(RowError::MissingValue(COLUMN_COST.to_string())),
        Cell::Number(value) => {
            Decimal::try_from(*value).map_err(|_| RowError::InvalidCost(value.to_string()))?
        }
        Cell::Text(raw) => {
            let normalized: String = raw
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            if normalized.is_empty() {
                return Err(RowError::MissingValue(COLUMN_COST.to_string()));
            }
            Decimal::from_str(&normalized).map_err(|_| RowError::InvalidCost(raw.trim().to_string()))?
        }
    };

    let mut cost = amount.round_dp(2);
    if cost.is_sign_negative() && !cost.is_zero() {
        return Err(RowError::InvalidCost(format!("{} is negative", cost)));
    }
    if cost >= Decimal::from(MAX_COST_EXCLUSIVE) {
        return Err(RowError::InvalidCost(format!("{} exceeds 99999999.99", cost)));
    }
    cost.rescale(2);
    Ok(cost.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_parse_date_text_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        for raw in [
            "2024-03-05",
            "05.03.2024",
            "05/03/2024",
            "2024-03-05 14:30:00",
            "2024-03-05T14:30:00",
            "2024-03-05T14:30:00.250",
            "2024-03-05T14:30:00+03:00",
        ] {
            assert_eq!(parse_date(&text(raw)).unwrap(), expected, "format {}", raw);
        }
    }

    #[test]
    fn test_parse_date_excel_serial() {
        // 45356 is 2024-03-05 in the 1900 date system
        assert_eq!(
            parse_date(&Cell::Number(45356.0)).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(
            parse_date(&Cell::Number(45356.75)).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert!(parse_date(&Cell::Number(-4.0)).is_err());
    }

    #[test]
    fn test_excel_serials_around_phantom_leap_day() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
        assert_eq!(date_from_excel_serial(1.0), date(1900, 1, 1));
        assert_eq!(date_from_excel_serial(59.0), date(1900, 2, 28));
        assert_eq!(date_from_excel_serial(60.0), None);
        assert_eq!(date_from_excel_serial(61.0), date(1900, 3, 1));
        assert!(matches!(parse_date(&Cell::Number(60.0)), Err(RowError::InvalidDate(_))));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(parse_date(&text("yesterday")), Err(RowError::InvalidDate(_))));
        assert!(matches!(parse_date(&Cell::Empty), Err(RowError::MissingValue(_))));
    }

    #[test]
    fn test_parse_cost_accepts_comma_and_spaces() {
        assert_eq!(parse_cost(&text("1 500,5")).unwrap().to_string(), "1500.50");
        assert_eq!(parse_cost(&text("1500")).unwrap().to_string(), "1500.00");
        assert_eq!(parse_cost(&Cell::Number(99.999)).unwrap().to_string(), "100.00");
    }

    #[test]
    fn test_parse_cost_rejects_invalid_values() {
        assert!(matches!(parse_cost(&text("abc")), Err(RowError::InvalidCost(_))));
        assert!(matches!(parse_cost(&text("-10")), Err(RowError::InvalidCost(_))));
        assert!(matches!(
            parse_cost(&text("100000000")),
            Err(RowError::InvalidCost(_))
        ));
        assert!(matches!(parse_cost(&Cell::Empty), Err(RowError::MissingValue(_))));
    }

    #[test]
    fn test_split_repair_types_drops_blanks() {
        assert_eq!(
            split_repair_types(" Oil change, ,Brake pads ,"),
            vec!["Oil change".to_string(), "Brake pads".to_string()]
        );
        assert!(split_repair_types("").is_empty());
    }

    #[test]
    fn test_column_map_reports_first_missing_column() {
        let table = Table {
            headers: vec!["Date", "Brand", "Model", "Repair-Types"]
                .into_iter()
                .map(String::from)
                .collect(),
            rows: Vec::new(),
        };
        match ColumnMap::from_table(&table) {
            Err(ImportError::MissingColumn(column)) => assert_eq!(column, "Cost"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_row_with_optional_columns_absent() {
        let table = Table {
            headers: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        };
        let columns = ColumnMap::from_table(&table).unwrap();
        let row = TableRow {
            line: 2,
            cells: vec![
                text("2024-03-05"),
                text(" Lada "),
                text("Vesta"),
                text("Oil change, Filters"),
                text("2500"),
            ],
        };

        let parsed = columns.parse_row(&row).unwrap();
        assert_eq!(parsed.brand, "Lada");
        assert_eq!(parsed.repair_types.len(), 2);
        assert_eq!(parsed.notes, "");
        assert_eq!(parsed.parts_used, "");
    }

    #[test]
    fn test_parse_row_requires_brand() {
        let table = Table {
            headers: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        };
        let columns = ColumnMap::from_table(&table).unwrap();
        let row = TableRow {
            line: 3,
            cells: vec![text("2024-03-05"), Cell::Empty, text("Vesta"), Cell::Empty, text("1")],
        };
        assert!(matches!(columns.parse_row(&row), Err(RowError::MissingValue(c)) if c == "Brand"));
    }
}

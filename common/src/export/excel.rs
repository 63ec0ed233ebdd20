// XLSX export: a works sheet plus per-brand statistics

use super::{category_names, repair_type_names, ExportError, EXPORT_HEADERS};
use crate::models::WorkRecord;
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};
use std::collections::BTreeMap;

pub const WORKS_SHEET: &str = "Works";
pub const STATISTICS_SHEET: &str = "Statistics";
pub const STATISTICS_HEADERS: [&str; 4] = ["Brand", "Total", "Count", "Average"];

/// Cost sum, work count and mean cost of one brand
#[derive(Debug, Clone, PartialEq)]
pub struct BrandStatistics {
    pub brand: String,
    pub total: Decimal,
    pub count: u64,
    pub average: Decimal,
}

/// Group works by brand name, sorted by name, amounts rounded to 2 digits
pub fn brand_statistics(works: &[WorkRecord]) -> Vec<BrandStatistics> {
    let mut groups: BTreeMap<&str, (Decimal, u64)> = BTreeMap::new();
    for work in works {
        let entry = groups
            .entry(work.car_brand.name.as_str())
            .or_insert((Decimal::ZERO, 0));
        entry.0 += work.cost;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(brand, (total, count))| BrandStatistics {
            brand: brand.to_string(),
            total: total.round_dp(2),
            count,
            average: (total / Decimal::from(count)).round_dp(2),
        })
        .collect()
}

fn excel_date(date: NaiveDate) -> Result<ExcelDateTime, ExportError> {
    let year = u16::try_from(date.year())
        .map_err(|_| ExportError::Excel(format!("date out of range: {}", date)))?;
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).map_err(xlsx_err)
}

fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> ExportError {
    ExportError::Excel(e.to_string())
}

fn write_header(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<(), ExportError> {
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, format)
            .map_err(xlsx_err)?;
    }
    Ok(())
}

pub fn write_workbook(works: &[WorkRecord]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("dd.mm.yyyy");
    let money_format = Format::new().set_num_format("0.00");

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(WORKS_SHEET).map_err(xlsx_err)?;
        write_header(sheet, &EXPORT_HEADERS, &header_format)?;

        for (index, work) in works.iter().enumerate() {
            let row = index as u32 + 1;
            sheet
                .write_datetime_with_format(row, 0, &excel_date(work.work_date)?, &date_format)
                .map_err(xlsx_err)?;
            sheet
                .write_string(row, 1, &work.car_brand.name)
                .map_err(xlsx_err)?;
            sheet
                .write_string(row, 2, &work.car_model.name)
                .map_err(xlsx_err)?;
            sheet
                .write_string(row, 3, category_names(work).join(", "))
                .map_err(xlsx_err)?;
            sheet
                .write_string(row, 4, repair_type_names(work).join(", "))
                .map_err(xlsx_err)?;
            sheet
                .write_number_with_format(
                    row,
                    5,
                    work.cost.to_f64().unwrap_or_default(),
                    &money_format,
                )
                .map_err(xlsx_err)?;
            sheet.write_string(row, 6, &work.notes).map_err(xlsx_err)?;
            sheet
                .write_string(row, 7, &work.parts_used)
                .map_err(xlsx_err)?;
        }

        sheet.set_column_width(0, 12).map_err(xlsx_err)?;
        sheet.set_column_width(3, 30).map_err(xlsx_err)?;
        sheet.set_column_width(4, 40).map_err(xlsx_err)?;
    }

    if !works.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(STATISTICS_SHEET).map_err(xlsx_err)?;
        write_header(sheet, &STATISTICS_HEADERS, &header_format)?;

        for (index, stats) in brand_statistics(works).iter().enumerate() {
            let row = index as u32 + 1;
            sheet.write_string(row, 0, &stats.brand).map_err(xlsx_err)?;
            sheet
                .write_number_with_format(row, 1, stats.total.to_f64().unwrap_or_default(), &money_format)
                .map_err(xlsx_err)?;
            sheet
                .write_number(row, 2, stats.count as f64)
                .map_err(xlsx_err)?;
            sheet
                .write_number_with_format(row, 3, stats.average.to_f64().unwrap_or_default(), &money_format)
                .map_err(xlsx_err)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dates_outside_excel_range_are_rejected() {
        assert!(excel_date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()).is_ok());
        assert!(excel_date(NaiveDate::from_ymd_opt(1800, 1, 1).unwrap()).is_err());
    }

    #[test]
    fn test_empty_workbook_is_written() {
        let bytes = write_workbook(&[]).unwrap();
        // XLSX files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }
}

// CSV export: UTF-8 with BOM, one row per work

use super::{category_names, money, repair_type_names, ExportError, EXPORT_HEADERS};
use crate::models::WorkRecord;
use ::csv::WriterBuilder;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Repair types listed per row
const MAX_REPAIR_TYPES: usize = 5;

/// Characters kept from notes and parts
const MAX_TEXT_CHARS: usize = 100;

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// CSV row for one work, in `EXPORT_HEADERS` order
pub fn work_row(work: &WorkRecord) -> [String; 8] {
    let repair_types = repair_type_names(work);
    [
        work.work_date.format("%d.%m.%Y").to_string(),
        work.car_brand.name.clone(),
        work.car_model.name.clone(),
        category_names(work).join(", "),
        repair_types
            .iter()
            .take(MAX_REPAIR_TYPES)
            .copied()
            .collect::<Vec<_>>()
            .join(", "),
        money(work.cost),
        truncate_chars(&work.notes, MAX_TEXT_CHARS),
        truncate_chars(&work.parts_used, MAX_TEXT_CHARS),
    ]
}

pub fn write_csv(works: &[WorkRecord]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = WriterBuilder::new().from_writer(&mut buffer);

        writer
            .write_record(EXPORT_HEADERS)
            .map_err(|e| ExportError::Csv(e.to_string()))?;

        for work in works {
            writer
                .write_record(work_row(work))
                .map_err(|e| ExportError::Csv(e.to_string()))?;
        }

        writer
            .flush()
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }

    Ok(buffer)
}

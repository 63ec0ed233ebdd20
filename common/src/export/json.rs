// JSON export: the full record list, pretty-printed

use super::ExportError;
use crate::models::WorkRecord;

/// Serialize works with nested brand, model, repair types and owner
///
/// Non-ASCII text is written as-is rather than escaped.
pub fn write_json(works: &[WorkRecord]) -> Result<Vec<u8>, ExportError> {
    Ok(serde_json::to_vec_pretty(works)?)
}

//! Location and stock-type filtering of raw inventory records.

use serde_json::Value;

use crate::types::RawInventoryRecord;

/// Location types kept in the report.
pub const LOCATION_TYPES: [&str; 4] = ["BULK", "CAB", "PICK", "RECV"];

/// The only stock type kept in the report (available stock).
pub const AVAILABLE_STOCK_TYPE: &str = "AV";

/// Uppercased text of a record field; absent or null reads as `""`.
///
/// Every field comparison in the filter goes through this helper so that
/// missing values are handled the same way everywhere.
#[must_use]
pub fn normalize_text(record: &RawInventoryRecord, field: &str) -> String {
    match record.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.to_uppercase(),
        Some(other) => other.to_string().to_uppercase(),
    }
}

/// Whether a record is an available-stock line in a reported location.
#[must_use]
pub fn record_matches(record: &RawInventoryRecord) -> bool {
    let location_type = normalize_text(record, "location_type");
    let stock_type = normalize_text(record, "stock_type");
    LOCATION_TYPES.contains(&location_type.as_str()) && stock_type == AVAILABLE_STOCK_TYPE
}

/// Keeps the matching records, in input order, without touching their fields.
#[must_use]
pub fn filter_records(records: &[RawInventoryRecord]) -> Vec<&RawInventoryRecord> {
    records.iter().filter(|r| record_matches(r)).collect()
}

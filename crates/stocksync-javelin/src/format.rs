//! Reshaping of filtered inventory records into sheet rows.
//!
//! Output columns follow [`COLUMN_MAPPING`] exactly; a missing vendor field
//! becomes an empty cell. The four epoch-second columns listed in
//! [`TIMESTAMP_COLUMNS`] are rendered as `YYYY-MM-DD HH:MM:SS`, and anything
//! that cannot be rendered becomes an empty cell instead of an error.

use chrono::{DateTime, Datelike, FixedOffset};
use serde_json::Value;

use crate::filter::filter_records;
use crate::types::RawInventoryRecord;

/// Vendor field → sheet header, in output column order.
pub const COLUMN_MAPPING: [(&str, &str); 27] = [
    ("warehouse_id", "Warehouse ID"),
    ("location_type", "Location Type"),
    ("location_id", "Location ID"),
    ("client_id", "Client ID"),
    ("product_id", "Product ID"),
    ("description_1", "Description"),
    ("pack_id", "Pack ID"),
    ("batch", "Batch"),
    ("expired_date", "Expired Date"),
    ("base_qty", "Base Qty"),
    ("base_uom", "Base Uom"),
    ("stock_type", "Stock Type"),
    ("pick_qty", "Pick Qty"),
    ("put_qty", "Put Qty"),
    ("aval_qty", "Aval Qty"),
    ("storage_unit", "Storage Unit"),
    ("last_movement_id", "Last Movement ID"),
    ("posting_date", "Posting Date"),
    ("product_group", "Product Group"),
    ("product_type", "Product Type"),
    ("product_section", "Product Section"),
    ("aging_posting", "Aging Posting"),
    ("aging_expiry", "Aging Expiry"),
    ("gross_weight", "Gross Weight (KG)"),
    ("volume", "Volume (M3)"),
    ("update_by", "Update By"),
    ("update_time", "Update Time"),
];

/// Headers whose source values are Unix epoch seconds.
pub const TIMESTAMP_COLUMNS: [&str; 4] =
    ["Expired Date", "Last Movement ID", "Posting Date", "Update Time"];

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// The vendor's placeholder for an unset date.
const NO_VALUE_MARKER: &str = "0";

/// Header-aligned display rows ready for the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedTable {
    pub rows: Vec<Vec<String>>,
}

impl FormattedTable {
    /// The fixed header row.
    #[must_use]
    pub fn headers() -> Vec<String> {
        COLUMN_MAPPING
            .iter()
            .map(|(_, header)| (*header).to_string())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        COLUMN_MAPPING.len()
    }
}

/// Result of the filter and transform stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// At least one record survived the filter.
    Rows(FormattedTable),
    /// Nothing matched; there is nothing to sync. Not an error.
    NoMatches { raw_count: usize },
}

/// Filters raw records and formats the survivors.
///
/// Pure: no I/O, and the input records are never modified.
#[must_use]
pub fn transform_inventory(records: &[RawInventoryRecord], offset: &FixedOffset) -> TransformOutcome {
    let kept = filter_records(records);
    if kept.is_empty() {
        return TransformOutcome::NoMatches {
            raw_count: records.len(),
        };
    }
    TransformOutcome::Rows(format_records(&kept, offset))
}

/// Maps each record onto [`COLUMN_MAPPING`].
#[must_use]
pub fn format_records(records: &[&RawInventoryRecord], offset: &FixedOffset) -> FormattedTable {
    let rows = records
        .iter()
        .map(|record| {
            COLUMN_MAPPING
                .iter()
                .map(|(field, header)| {
                    let value = record.get(*field);
                    if TIMESTAMP_COLUMNS.contains(header) {
                        format_timestamp(value, offset)
                    } else {
                        cell_text(value)
                    }
                })
                .collect()
        })
        .collect();
    FormattedTable { rows }
}

/// Renders an epoch-seconds value as `YYYY-MM-DD HH:MM:SS` at `offset`.
///
/// Null, absent, empty and the exact string `"0"` mean "no value". Every
/// other zero (`"00"`, `" 0 "`, numeric `0`) is a real epoch and renders as
/// 1970-01-01. Anything that does not parse as whole seconds, or lands
/// outside years 0 to 9999, also yields `""`. Never fails.
#[must_use]
pub fn format_timestamp(value: Option<&Value>, offset: &FixedOffset) -> String {
    if matches!(value, Some(Value::String(s)) if s == NO_VALUE_MARKER) {
        return String::new();
    }
    let Some(secs) = value.and_then(epoch_seconds) else {
        return String::new();
    };
    match DateTime::from_timestamp(secs, 0) {
        Some(utc) => {
            let local = utc.with_timezone(offset);
            if (0..=9999).contains(&local.year()) {
                local.format(DISPLAY_FORMAT).to_string()
            } else {
                String::new()
            }
        }
        None => String::new(),
    }
}

fn epoch_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
                .map(|f| {
                    #[allow(clippy::cast_possible_truncation)]
                    let whole = f as i64;
                    whole
                })
        }),
        _ => None,
    }
}

/// Display text of a plain cell; null and absent become `""`.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
#[path = "format_test.rs"]
mod tests;

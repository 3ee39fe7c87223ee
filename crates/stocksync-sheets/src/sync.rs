//! Sheet synchronizer: full replacement of the inventory worksheet and the
//! best-effort "last updated" marker.

use chrono::{DateTime, TimeZone};

use crate::error::SheetsError;
use crate::sink::{SpreadsheetSink, WorksheetSize};

/// Grid a missing inventory worksheet is created with.
pub const INVENTORY_SHEET_SIZE: WorksheetSize = WorksheetSize::new(1000, 30);
/// Grid a missing marker worksheet is created with.
pub const MARKER_SHEET_SIZE: WorksheetSize = WorksheetSize::new(10, 2);

pub const MARKER_HEADER: [&str; 2] = ["type", "last_update"];
pub const ERP_MARKER_KEY: &str = "ERP";
pub const JAVELIN_MARKER_KEY: &str = "Javelin";

const KNOWN_MARKER_KEYS: [&str; 2] = [ERP_MARKER_KEY, JAVELIN_MARKER_KEY];
const UNSET_MARKER: &str = "-";
const MARKER_FORMAT: &str = "%d %b %Y, %H:%M";

/// Replaces the whole content of worksheet `name` with `headers` + `rows`.
///
/// The worksheet is created at [`INVENTORY_SHEET_SIZE`] when missing, then
/// cleared, then written in a single bulk call. Repeating the call with the
/// same input leaves the worksheet in the same state. Returns the number of
/// data rows written.
///
/// # Errors
///
/// Any sink failure is returned unchanged. A failure after the clear leaves
/// the worksheet empty; callers report it as a failed run.
pub async fn replace_sheet<S: SpreadsheetSink>(
    sink: &S,
    name: &str,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<usize, SheetsError> {
    if sink.ensure_worksheet(name, INVENTORY_SHEET_SIZE).await? {
        tracing::info!(worksheet = name, "inventory worksheet was missing and has been created");
    }

    sink.clear(name).await?;

    let mut payload = Vec::with_capacity(rows.len() + 1);
    payload.push(headers.to_vec());
    payload.extend_from_slice(rows);
    sink.write_rows(name, &payload).await?;

    tracing::info!(worksheet = name, rows = rows.len(), "worksheet replaced");
    Ok(rows.len())
}

/// Records `timestamp` under `key` in the marker worksheet.
///
/// Best effort: every failure is logged and swallowed. Returns whether the
/// marker was written.
pub async fn update_marker<S: SpreadsheetSink>(
    sink: &S,
    sheet: &str,
    key: &str,
    timestamp: &str,
) -> bool {
    match try_update_marker(sink, sheet, key, timestamp).await {
        Ok(()) => {
            tracing::info!(worksheet = sheet, key, timestamp, "last-update marker written");
            true
        }
        Err(e) => {
            tracing::warn!(worksheet = sheet, key, error = %e, "could not update last-update marker");
            false
        }
    }
}

async fn try_update_marker<S: SpreadsheetSink>(
    sink: &S,
    sheet: &str,
    key: &str,
    timestamp: &str,
) -> Result<(), SheetsError> {
    sink.ensure_worksheet(sheet, MARKER_SHEET_SIZE).await?;

    let existing = match sink.read_all(sheet).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(worksheet = sheet, error = %e, "unreadable markers, starting from defaults");
            Vec::new()
        }
    };

    let rows = build_marker_rows(&existing, key, timestamp);
    sink.clear(sheet).await?;
    sink.write_rows(sheet, &rows).await
}

/// Builds the marker table after setting `key` to `timestamp`.
///
/// Rows shorter than two cells, blank keys and the header row are ignored.
/// Every other key keeps its value. Known keys that were never written read
/// as `-`. Output is the header, the known keys, then any other keys in the
/// order they were found.
#[must_use]
pub fn build_marker_rows(existing: &[Vec<String>], key: &str, timestamp: &str) -> Vec<Vec<String>> {
    let mut entries: Vec<(String, String)> = Vec::new();
    for row in existing {
        let [name, value, ..] = row.as_slice() else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || name == MARKER_HEADER[0] {
            continue;
        }
        set_entry(&mut entries, name, value);
    }
    set_entry(&mut entries, key, timestamp);

    let mut rows = vec![MARKER_HEADER.iter().map(|h| (*h).to_string()).collect()];
    for known in KNOWN_MARKER_KEYS {
        let value = entries
            .iter()
            .find(|(name, _)| name == known)
            .map_or(UNSET_MARKER, |(_, value)| value.as_str());
        rows.push(vec![known.to_string(), value.to_string()]);
    }
    rows.extend(
        entries
            .into_iter()
            .filter(|(name, _)| !KNOWN_MARKER_KEYS.contains(&name.as_str()))
            .map(|(name, value)| vec![name, value]),
    );
    rows
}

fn set_entry(entries: &mut Vec<(String, String)>, name: &str, value: &str) {
    match entries.iter_mut().find(|(existing, _)| existing == name) {
        Some(entry) => entry.1 = value.to_string(),
        None => entries.push((name.to_string(), value.to_string())),
    }
}

/// Marker display form, e.g. `05 Mar 2025, 14:07`.
#[must_use]
pub fn marker_timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format(MARKER_FORMAT).to_string()
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;

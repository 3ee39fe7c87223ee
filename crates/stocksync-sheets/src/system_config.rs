//! Key/value lookups in the `system_config` worksheet.
//!
//! The worksheet has a header row naming a `config_key` and a
//! `config_value` column; each later row is one setting. Optional
//! `updated_by` and `updated_at` columns record who last wrote a row.

use serde::Deserialize;

use crate::error::SheetsError;
use crate::sink::SpreadsheetSink;

pub const CONFIG_KEY_HEADER: &str = "config_key";
pub const CONFIG_VALUE_HEADER: &str = "config_value";
pub const UPDATED_BY_HEADER: &str = "updated_by";
pub const UPDATED_AT_HEADER: &str = "updated_at";
/// Header written to a config worksheet that has no rows yet.
pub const CONFIG_SHEET_HEADER: [&str; 4] = [
    CONFIG_KEY_HEADER,
    CONFIG_VALUE_HEADER,
    UPDATED_BY_HEADER,
    UPDATED_AT_HEADER,
];
pub const COOKIE_CONFIG_KEY: &str = "javelin_cookie";
pub const CREDENTIALS_CONFIG_KEY: &str = "javelin_credentials";

/// State of one setting row in the config worksheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigEntry {
    #[default]
    Missing,
    /// The key row exists but its value is blank.
    Empty,
    /// The key row holds a value of `len` characters.
    Present { len: usize },
}

impl ConfigEntry {
    #[must_use]
    pub fn is_present(self) -> bool {
        matches!(self, ConfigEntry::Present { .. })
    }
}

/// What the diagnostic checker learns from the config worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSheetReport {
    /// No setting rows below the header, or no rows at all.
    pub is_empty: bool,
    pub has_key_header: bool,
    pub has_value_header: bool,
    pub setting_count: usize,
    pub cookie: ConfigEntry,
    pub credentials: ConfigEntry,
}

struct Columns {
    key: usize,
    value: Option<usize>,
}

fn columns(header: &[String]) -> Option<Columns> {
    let position = |name: &str| header.iter().position(|h| h.trim() == name);
    Some(Columns {
        key: position(CONFIG_KEY_HEADER)?,
        value: position(CONFIG_VALUE_HEADER),
    })
}

/// Non-blank value stored under `key`, trimmed.
///
/// Returns `None` when the header row lacks either column or no row has a
/// value for `key`. The first matching row wins.
#[must_use]
pub fn find_config_value(rows: &[Vec<String>], key: &str) -> Option<String> {
    let (header, settings) = rows.split_first()?;
    let Columns { key: k, value: v } = columns(header)?;
    let v = v?;
    settings
        .iter()
        .filter(|row| row.get(k).is_some_and(|cell| cell.trim() == key))
        .find_map(|row| {
            row.get(v)
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .map(str::to_string)
        })
}

#[must_use]
pub fn inspect_config_rows(rows: &[Vec<String>]) -> ConfigSheetReport {
    let Some((header, settings)) = rows.split_first() else {
        return ConfigSheetReport {
            is_empty: true,
            ..ConfigSheetReport::default()
        };
    };
    let Some(cols) = columns(header) else {
        return ConfigSheetReport {
            is_empty: settings.is_empty(),
            setting_count: settings.len(),
            ..ConfigSheetReport::default()
        };
    };

    let entry = |key: &str| {
        if !settings
            .iter()
            .any(|row| row.get(cols.key).is_some_and(|cell| cell.trim() == key))
        {
            return ConfigEntry::Missing;
        }
        find_config_value(rows, key).map_or(ConfigEntry::Empty, |value| ConfigEntry::Present {
            len: value.chars().count(),
        })
    };

    ConfigSheetReport {
        is_empty: settings.is_empty(),
        has_key_header: true,
        has_value_header: cols.value.is_some(),
        setting_count: settings.len(),
        cookie: entry(COOKIE_CONFIG_KEY),
        credentials: entry(CREDENTIALS_CONFIG_KEY),
    }
}

/// Reads worksheet `sheet` and looks up `key`.
///
/// # Errors
///
/// Returns the sink error if the worksheet cannot be read.
pub async fn lookup_config_value<S: SpreadsheetSink>(
    sink: &S,
    sheet: &str,
    key: &str,
) -> Result<Option<String>, SheetsError> {
    let rows = sink.read_all(sheet).await?;
    Ok(find_config_value(&rows, key))
}

/// Operator login stored as JSON under `javelin_credentials`.
#[derive(Clone, Deserialize)]
pub struct StoredLogin {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for StoredLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredLogin")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Parses a `{"username": ..., "password": ...}` setting.
///
/// Returns `None` when the value is not that JSON object or either field is
/// blank.
#[must_use]
pub fn parse_stored_login(value: &str) -> Option<StoredLogin> {
    match serde_json::from_str::<StoredLogin>(value) {
        Ok(login) if !login.username.trim().is_empty() && !login.password.is_empty() => Some(login),
        Ok(_) => {
            tracing::warn!("stored login lacks a username or password");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "stored login is not valid JSON");
            None
        }
    }
}

/// One setting row to write.
#[derive(Debug, Clone, Copy)]
pub struct ConfigUpdate<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub updated_by: &'a str,
    pub updated_at: &'a str,
}

/// Returns `rows` with the row for `update.key` replaced, or appended when
/// the key has no row yet.
///
/// Cells are placed by header; `updated_by` and `updated_at` are written
/// only when the header has those columns. An empty worksheet gets
/// [`CONFIG_SHEET_HEADER`] first.
///
/// # Errors
///
/// Returns [`SheetsError::ConfigLayout`] when the header row lacks
/// `config_key` or `config_value`.
pub fn upsert_config_row(
    mut rows: Vec<Vec<String>>,
    sheet: &str,
    update: &ConfigUpdate<'_>,
) -> Result<Vec<Vec<String>>, SheetsError> {
    if rows.is_empty() {
        rows.push(CONFIG_SHEET_HEADER.iter().map(|h| (*h).to_string()).collect());
    }
    let header = &rows[0];
    let position = |name: &str| header.iter().position(|h| h.trim() == name);
    let (Some(key_col), Some(value_col)) =
        (position(CONFIG_KEY_HEADER), position(CONFIG_VALUE_HEADER))
    else {
        return Err(SheetsError::ConfigLayout(sheet.to_string()));
    };
    let cells = [
        (Some(key_col), update.key),
        (Some(value_col), update.value),
        (position(UPDATED_BY_HEADER), update.updated_by),
        (position(UPDATED_AT_HEADER), update.updated_at),
    ];

    let existing = rows
        .iter()
        .skip(1)
        .position(|row| row.get(key_col).is_some_and(|cell| cell.trim() == update.key));
    let index = match existing {
        Some(offset) => offset + 1,
        None => {
            rows.push(Vec::new());
            rows.len() - 1
        }
    };

    let row = &mut rows[index];
    for (column, text) in cells {
        let Some(column) = column else { continue };
        if row.len() <= column {
            row.resize(column + 1, String::new());
        }
        row[column] = text.to_string();
    }
    Ok(rows)
}

/// Writes `update` into worksheet `sheet`, keeping every other row.
///
/// # Errors
///
/// Returns the sink error if the worksheet cannot be read or written, or
/// [`SheetsError::ConfigLayout`] when its header is unusable.
pub async fn upsert_config_value<S: SpreadsheetSink>(
    sink: &S,
    sheet: &str,
    update: &ConfigUpdate<'_>,
) -> Result<(), SheetsError> {
    let rows = upsert_config_row(sink.read_all(sheet).await?, sheet, update)?;
    sink.write_rows(sheet, &rows).await?;
    tracing::info!(worksheet = sheet, key = update.key, "config value saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySpreadsheet;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    fn sheet() -> Vec<Vec<String>> {
        vec![
            row(&["config_key", "config_value", "notes"]),
            row(&["erp_url", "https://erp.example"]),
            row(&["javelin_cookie", "  sess=abc  ", "rotated weekly"]),
        ]
    }

    #[test]
    fn finds_trimmed_value() {
        assert_eq!(
            find_config_value(&sheet(), COOKIE_CONFIG_KEY).as_deref(),
            Some("sess=abc")
        );
    }

    #[test]
    fn columns_are_located_by_header() {
        let rows = vec![
            row(&["config_value", "config_key"]),
            row(&["sess=xyz", "javelin_cookie"]),
        ];
        assert_eq!(
            find_config_value(&rows, COOKIE_CONFIG_KEY).as_deref(),
            Some("sess=xyz")
        );
    }

    #[test]
    fn blank_value_is_absent() {
        let rows = vec![row(&["config_key", "config_value"]), row(&["javelin_cookie", "  "])];
        assert_eq!(find_config_value(&rows, COOKIE_CONFIG_KEY), None);
    }

    #[test]
    fn missing_headers_find_nothing() {
        let rows = vec![row(&["key", "value"]), row(&["javelin_cookie", "sess=abc"])];
        assert_eq!(find_config_value(&rows, COOKIE_CONFIG_KEY), None);
        assert_eq!(find_config_value(&[], COOKIE_CONFIG_KEY), None);
    }

    #[test]
    fn report_summarizes_sheet() {
        let report = inspect_config_rows(&sheet());
        assert_eq!(
            report,
            ConfigSheetReport {
                is_empty: false,
                has_key_header: true,
                has_value_header: true,
                setting_count: 2,
                cookie: ConfigEntry::Present { len: 8 },
                credentials: ConfigEntry::Missing,
            }
        );
    }

    #[test]
    fn report_distinguishes_blank_rows() {
        let rows = vec![
            row(&["config_key", "config_value"]),
            row(&["javelin_cookie", ""]),
            row(&["javelin_credentials", "{\"user\":\"x\"}"]),
        ];
        let report = inspect_config_rows(&rows);
        assert_eq!(report.cookie, ConfigEntry::Empty);
        assert!(report.credentials.is_present());
    }

    #[test]
    fn report_without_key_header() {
        let report = inspect_config_rows(&[row(&["a", "b"]), row(&["c", "d"])]);
        assert!(!report.has_key_header);
        assert_eq!(report.setting_count, 1);
        assert_eq!(report.cookie, ConfigEntry::Missing);
    }

    #[tokio::test]
    async fn lookup_reads_through_sink() {
        let sink = MemorySpreadsheet::new().with_sheet("system_config", sheet());
        let value = lookup_config_value(&sink, "system_config", COOKIE_CONFIG_KEY)
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("sess=abc"));
    }

    #[tokio::test]
    async fn lookup_of_missing_sheet_is_error() {
        let sink = MemorySpreadsheet::new();
        assert!(lookup_config_value(&sink, "system_config", COOKIE_CONFIG_KEY)
            .await
            .is_err());
    }

    #[test]
    fn report_flags_empty_sheet() {
        assert!(inspect_config_rows(&[]).is_empty);
        let header_only = inspect_config_rows(&[row(&["config_key", "config_value"])]);
        assert!(header_only.is_empty);
        assert!(header_only.has_key_header);
        assert!(!inspect_config_rows(&sheet()).is_empty);
    }

    #[test]
    fn report_without_value_header() {
        let report = inspect_config_rows(&[row(&["config_key"]), row(&["javelin_cookie"])]);
        assert!(report.has_key_header);
        assert!(!report.has_value_header);
    }

    #[test]
    fn stored_login_needs_both_fields() {
        let login = parse_stored_login(r#"{"username":"lead","password":"hunter2"}"#).unwrap();
        assert_eq!(login.username, "lead");
        assert_eq!(login.password, "hunter2");
        assert!(parse_stored_login(r#"{"username":"lead"}"#).is_none());
        assert!(parse_stored_login(r#"{"username":" ","password":"pw"}"#).is_none());
        assert!(parse_stored_login("lead:pw").is_none());
        assert!(!format!("{login:?}").contains("hunter2"));
    }

    fn update<'a>(key: &'a str, value: &'a str) -> ConfigUpdate<'a> {
        ConfigUpdate {
            key,
            value,
            updated_by: "system",
            updated_at: "19 Oct 2026, 08:15",
        }
    }

    #[test]
    fn upsert_replaces_existing_row_in_place() {
        let rows = vec![
            row(&["config_key", "config_value", "updated_by", "updated_at"]),
            row(&["javelin_cookie", "sess=old", "ops", "01 Jan 2026, 09:00"]),
            row(&["erp_url", "https://erp.example"]),
        ];
        let rows = upsert_config_row(rows, "system_config", &update("javelin_cookie", "sess=new"))
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            row(&["javelin_cookie", "sess=new", "system", "19 Oct 2026, 08:15"])
        );
        assert_eq!(rows[2], row(&["erp_url", "https://erp.example"]));
    }

    #[test]
    fn upsert_appends_and_follows_header_order() {
        let rows = vec![row(&["config_value", "config_key"]), row(&["x", "erp_url"])];
        let rows = upsert_config_row(rows, "system_config", &update("javelin_cookie", "sess=new"))
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], row(&["sess=new", "javelin_cookie"]));
    }

    #[test]
    fn upsert_into_empty_sheet_writes_header() {
        let rows = upsert_config_row(Vec::new(), "system_config", &update("javelin_cookie", "sess=1"))
            .unwrap();
        assert_eq!(
            rows,
            vec![
                row(&["config_key", "config_value", "updated_by", "updated_at"]),
                row(&["javelin_cookie", "sess=1", "system", "19 Oct 2026, 08:15"]),
            ]
        );
    }

    #[test]
    fn upsert_without_value_column_is_layout_error() {
        let err = upsert_config_row(vec![row(&["config_key"])], "system_config", &update("k", "v"))
            .unwrap_err();
        assert!(matches!(err, SheetsError::ConfigLayout(ref s) if s == "system_config"));
    }

    #[tokio::test]
    async fn upsert_writes_through_sink() {
        let sink = MemorySpreadsheet::new().with_sheet("system_config", sheet());
        upsert_config_value(&sink, "system_config", &update("javelin_cookie", "sess=fresh"))
            .await
            .unwrap();
        assert_eq!(
            lookup_config_value(&sink, "system_config", COOKIE_CONFIG_KEY)
                .await
                .unwrap()
                .as_deref(),
            Some("sess=fresh")
        );
        let rows = sink.rows("system_config").unwrap();
        assert_eq!(rows[2][2], "rotated weekly");
    }
}

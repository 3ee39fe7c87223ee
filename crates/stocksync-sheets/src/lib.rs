pub mod auth;
pub mod error;
pub mod google;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod sink;
pub mod sync;
pub mod system_config;

pub use error::SheetsError;
pub use google::{quote_sheet_name, GoogleSheetsClient, SpreadsheetMetadata};
#[cfg(any(test, feature = "memory"))]
pub use memory::MemorySpreadsheet;
pub use sink::{SpreadsheetSink, WorksheetSize};
pub use sync::{
    build_marker_rows, marker_timestamp, replace_sheet, update_marker, ERP_MARKER_KEY,
    INVENTORY_SHEET_SIZE, JAVELIN_MARKER_KEY, MARKER_HEADER, MARKER_SHEET_SIZE,
};
pub use system_config::{
    find_config_value, inspect_config_rows, lookup_config_value, parse_stored_login,
    upsert_config_row, upsert_config_value, ConfigEntry, ConfigSheetReport, ConfigUpdate,
    StoredLogin, CONFIG_KEY_HEADER, CONFIG_SHEET_HEADER, CONFIG_VALUE_HEADER, COOKIE_CONFIG_KEY,
    CREDENTIALS_CONFIG_KEY, UPDATED_AT_HEADER, UPDATED_BY_HEADER,
};

pub mod client;
pub mod cookie;
pub mod error;
pub mod filter;
pub mod format;
pub mod types;

pub use client::JavelinClient;
pub use cookie::{clean_cookie, has_session_part};
pub use error::{JavelinError, Step};
pub use filter::{filter_records, normalize_text, record_matches};
pub use format::{
    format_records, format_timestamp, transform_inventory, FormattedTable, TransformOutcome,
    COLUMN_MAPPING, TIMESTAMP_COLUMNS,
};
pub use types::{RawInventoryRecord, SessionCredential};

//! The `refresh` command: authenticate, fetch, filter, transform, sync.
//!
//! Progress goes to stdout as numbered lines. The last stdout lines are a
//! separator, `RESULT:` and a single-line JSON object that callers parse.
//!
//! The cookie comes from the first source that has one: the argument,
//! `JAVELIN_COOKIE`, the `javelin_cookie` setting, or a login with the
//! `javelin_credentials` setting whose cookie is then saved back.

use anyhow::Context;
use chrono::{FixedOffset, Local, Offset, Utc};
use serde::Serialize;
use stocksync_core::{AppConfig, ConfigError};
use stocksync_javelin::{transform_inventory, FormattedTable, JavelinClient, TransformOutcome};
use stocksync_sheets::{
    lookup_config_value, marker_timestamp, parse_stored_login, replace_sheet, update_marker,
    upsert_config_value, ConfigUpdate, SpreadsheetSink, StoredLogin, COOKIE_CONFIG_KEY,
    CREDENTIALS_CONFIG_KEY, JAVELIN_MARKER_KEY,
};

use crate::{javelin_client, sheets_client, EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE};

const NO_MATCHES_MESSAGE: &str = "No data matches filter criteria";
const SUCCESS_MESSAGE: &str = "Javelin inventory refreshed successfully";
/// `updated_by` of a cookie saved after a login with stored credentials.
const AUTO_LOGIN_AUTHOR: &str = "system";

/// Machine-readable outcome of one refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RefreshResult {
    pub success: bool,
    pub message: String,
    pub rows: usize,
}

impl RefreshResult {
    fn succeeded(rows: usize) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            rows,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            rows: 0,
        }
    }

    fn no_matches() -> Self {
        Self::failed(NO_MATCHES_MESSAGE.to_string())
    }

    fn exit_status(&self) -> u8 {
        if self.success {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }
}

/// Where the pipeline reads and writes.
#[derive(Debug, Clone)]
pub(crate) struct SyncTargets<'a> {
    pub inventory_sheet: &'a str,
    pub marker_sheet: &'a str,
    pub config_sheet: &'a str,
    pub display_offset: FixedOffset,
}

/// Where the session cookie came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CookieSource {
    /// The command-line argument or `JAVELIN_COOKIE`.
    Direct,
    ConfigSheet,
    /// A login with the stored `javelin_credentials`.
    AutoLogin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CookieResolution {
    Found { cookie: String, source: CookieSource },
    /// No source has a cookie or a usable stored login.
    Missing,
    /// A stored login exists but could not produce a cookie.
    LoginFailed(String),
}

pub(crate) async fn run_refresh(
    config: Result<AppConfig, ConfigError>,
    cookie_arg: Option<&str>,
) -> u8 {
    println!("Starting Javelin inventory refresh...");
    println!("Timestamp: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            let result = report_failure(&anyhow::Error::new(e).context("invalid configuration"));
            print_result(&result);
            return result.exit_status();
        }
    };

    let direct_cookie = first_non_blank(&[cookie_arg, config.javelin_cookie.as_deref()]);
    let sheets = sheets_client(&config).await;
    let javelin = javelin_client(&config);
    let targets = SyncTargets {
        inventory_sheet: &config.inventory_sheet,
        marker_sheet: &config.marker_sheet,
        config_sheet: &config.config_sheet,
        display_offset: display_offset(&config),
    };
    refresh_with(&targets, direct_cookie, sheets, javelin).await
}

/// Resolves the cookie and runs the pipeline with whichever clients could be
/// built. Returns the process exit status.
pub(crate) async fn refresh_with<S: SpreadsheetSink>(
    targets: &SyncTargets<'_>,
    direct_cookie: Option<String>,
    sheets: anyhow::Result<S>,
    javelin: anyhow::Result<JavelinClient>,
) -> u8 {
    if let Err(e) = &sheets {
        tracing::warn!(error = %format!("{e:#}"), "Google Sheets is unavailable");
    }

    let resolution = resolve_cookie(
        direct_cookie,
        sheets.as_ref().ok(),
        javelin.as_ref().ok(),
        targets.config_sheet,
    )
    .await;
    let (cookie, source) = match resolution {
        CookieResolution::Found { cookie, source } => (cookie, source),
        CookieResolution::Missing => {
            print_usage(targets.config_sheet);
            return EXIT_USAGE;
        }
        CookieResolution::LoginFailed(reason) => {
            let result = fail(format!("Javelin auto-login failed: {reason}"));
            print_result(&result);
            return result.exit_status();
        }
    };
    tracing::info!(source = ?source, "using javelin cookie");

    let mut result = match (javelin, sheets) {
        (Ok(javelin), Ok(sheets)) => refresh_inventory(&javelin, &sheets, &cookie, targets).await,
        (Err(e), _) | (_, Err(e)) => report_failure(&e),
    };
    if result.success && source == CookieSource::AutoLogin {
        result.message = format!("{SUCCESS_MESSAGE} (auto-login)");
    }

    print_result(&result);
    result.exit_status()
}

/// Finds a cookie in source order; only the stored login makes vendor calls.
pub(crate) async fn resolve_cookie<S: SpreadsheetSink>(
    direct: Option<String>,
    sheets: Option<&S>,
    javelin: Option<&JavelinClient>,
    config_sheet: &str,
) -> CookieResolution {
    if let Some(cookie) = direct {
        return CookieResolution::Found {
            cookie,
            source: CookieSource::Direct,
        };
    }
    let Some(sink) = sheets else {
        return CookieResolution::Missing;
    };
    if let Some(cookie) = cookie_from_sheet(sink, config_sheet).await {
        return CookieResolution::Found {
            cookie,
            source: CookieSource::ConfigSheet,
        };
    }
    let Some(login) = login_from_sheet(sink, config_sheet).await else {
        return CookieResolution::Missing;
    };
    let Some(javelin) = javelin else {
        return CookieResolution::LoginFailed(
            "the Javelin client is not configured".to_string(),
        );
    };

    match auto_login(javelin, sink, config_sheet, &login).await {
        Ok(cookie) => CookieResolution::Found {
            cookie,
            source: CookieSource::AutoLogin,
        },
        Err(e) => CookieResolution::LoginFailed(format!("{e:#}")),
    }
}

/// Logs in with the stored credentials and saves the new cookie.
async fn auto_login<S: SpreadsheetSink>(
    javelin: &JavelinClient,
    sink: &S,
    config_sheet: &str,
    login: &StoredLogin,
) -> anyhow::Result<String> {
    println!("No cookie found, logging in to Javelin as {}...", login.username);
    let cookie = javelin
        .login_with_password(&login.username, &login.password)
        .await
        .with_context(|| format!("login with {CREDENTIALS_CONFIG_KEY} failed"))?;

    let stamp = marker_timestamp(&Local::now());
    let update = ConfigUpdate {
        key: COOKIE_CONFIG_KEY,
        value: &cookie,
        updated_by: AUTO_LOGIN_AUTHOR,
        updated_at: &stamp,
    };
    upsert_config_value(sink, config_sheet, &update)
        .await
        .with_context(|| format!("cannot save {COOKIE_CONFIG_KEY} to '{config_sheet}'"))?;
    println!("   New cookie obtained via auto-login");
    Ok(cookie)
}

fn print_usage(config_sheet: &str) {
    eprintln!("ERROR: Cookie not provided");
    eprintln!("Usage: stocksync refresh <COOKIE>");
    eprintln!(
        "Or set JAVELIN_COOKIE, or store '{COOKIE_CONFIG_KEY}' or '{CREDENTIALS_CONFIG_KEY}' \
         in the '{config_sheet}' worksheet"
    );
}

/// Runs the pipeline once and converts every failure into a result.
pub(crate) async fn refresh_inventory<S: SpreadsheetSink>(
    javelin: &JavelinClient,
    sink: &S,
    cookie: &str,
    targets: &SyncTargets<'_>,
) -> RefreshResult {
    match run_pipeline(javelin, sink, cookie, targets).await {
        Ok(result) => result,
        Err(e) => report_failure(&e),
    }
}

async fn run_pipeline<S: SpreadsheetSink>(
    javelin: &JavelinClient,
    sink: &S,
    cookie: &str,
    targets: &SyncTargets<'_>,
) -> anyhow::Result<RefreshResult> {
    println!("\n1. Fetching data from Javelin API...");
    let session = javelin
        .authenticate(cookie)
        .await
        .context("Javelin authentication error")?;
    let records = javelin
        .fetch_inventory(&session, cookie)
        .await
        .context("Javelin inventory error")?;
    println!("   Retrieved {} raw inventory records", records.len());

    println!("\n2. Filtering data (BULK, CAB, PICK, RECV + AV only)...");
    let table = match transform_inventory(&records, &targets.display_offset) {
        TransformOutcome::Rows(table) => table,
        TransformOutcome::NoMatches { raw_count } => {
            println!("   Filtered to 0 records");
            println!("   WARNING: {NO_MATCHES_MESSAGE}!");
            tracing::warn!(raw_count, "no inventory records matched the filter");
            return Ok(RefreshResult::no_matches());
        }
    };
    println!("   Filtered to {} records", table.len());

    println!("\n3. Formatting data for Google Sheets...");
    println!(
        "   Formatted {} rows with {} columns",
        table.len(),
        table.column_count()
    );

    println!("\n4. Updating Google Sheet...");
    let rows = replace_sheet(
        sink,
        targets.inventory_sheet,
        &FormattedTable::headers(),
        &table.rows,
    )
    .await
    .with_context(|| format!("error updating worksheet '{}'", targets.inventory_sheet))?;
    println!(
        "   Successfully updated {rows} rows to sheet '{}'",
        targets.inventory_sheet
    );

    println!("\n5. Updating {} sheet...", targets.marker_sheet);
    let stamp = marker_timestamp(&Local::now());
    if update_marker(sink, targets.marker_sheet, JAVELIN_MARKER_KEY, &stamp).await {
        println!("   Updated {} sheet with timestamp: {stamp}", targets.marker_sheet);
    } else {
        println!("   WARNING: could not update {} sheet", targets.marker_sheet);
    }

    println!("\nSUCCESS!");
    println!("   Total rows imported: {rows}");
    Ok(RefreshResult::succeeded(rows))
}

fn report_failure(error: &anyhow::Error) -> RefreshResult {
    fail(format!("{error:#}"))
}

fn fail(message: String) -> RefreshResult {
    tracing::error!(error = %message, "refresh failed");
    println!("\nERROR: {message}");
    RefreshResult::failed(message)
}

fn print_result(result: &RefreshResult) {
    let json = serde_json::to_string(result).unwrap_or_else(|e| {
        format!(r#"{{"success":false,"message":"result encoding failed: {e}","rows":0}}"#)
    });
    let rule = "=".repeat(50);
    println!("\n{rule}");
    println!("RESULT:");
    println!("{json}");
    println!("{rule}");
}

fn first_non_blank(candidates: &[Option<&str>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// Cookie stored in the config worksheet; lookup failures read as "none".
pub(crate) async fn cookie_from_sheet<S: SpreadsheetSink>(sink: &S, sheet: &str) -> Option<String> {
    match lookup_config_value(sink, sheet, COOKIE_CONFIG_KEY).await {
        Ok(Some(cookie)) => {
            tracing::info!(worksheet = sheet, "using cookie from config worksheet");
            Some(cookie)
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(worksheet = sheet, error = %e, "could not read config worksheet");
            None
        }
    }
}

/// Login stored in the config worksheet; unreadable or malformed reads as "none".
async fn login_from_sheet<S: SpreadsheetSink>(sink: &S, sheet: &str) -> Option<StoredLogin> {
    match lookup_config_value(sink, sheet, CREDENTIALS_CONFIG_KEY).await {
        Ok(value) => value.as_deref().and_then(parse_stored_login),
        Err(e) => {
            tracing::warn!(worksheet = sheet, error = %e, "could not read config worksheet");
            None
        }
    }
}

fn display_offset(config: &AppConfig) -> FixedOffset {
    // Range-checked at config load; UTC is only a fallback.
    FixedOffset::east_opt(config.display_utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;

use std::path::PathBuf;

use crate::app_config::{AppConfig, JavelinSettings};
use crate::ConfigError;

const DEFAULT_BASE_URL: &str = "https://torch.javelin-apps.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_JAVELIN_UTC_OFFSET_MINUTES: i32 = 420;

/// Configuration read from the environment.
///
/// A rejected value is recorded in `problems` and its default is used in
/// `config`, so `diagnose` can still inspect a half-broken environment.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub problems: Vec<ConfigError>,
}

impl LoadedConfig {
    /// The configuration when every value was accepted.
    ///
    /// # Errors
    ///
    /// Returns the first rejected value.
    pub fn into_result(self) -> Result<AppConfig, ConfigError> {
        match self.problems.into_iter().next() {
            Some(problem) => Err(problem),
            None => Ok(self.config),
        }
    }
}

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
#[must_use]
pub fn load_app_config() -> LoadedConfig {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
#[must_use]
pub fn load_app_config_from_env() -> LoadedConfig {
    build_loaded_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Nothing is strictly required at this point: each subcommand checks for the
/// values it needs. Empty values are treated as unset.
fn build_loaded_config<F>(lookup: F) -> LoadedConfig
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let mut problems = Vec::new();

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default =
        |var: &str, default: &str| -> String { optional(var).unwrap_or_else(|| default.to_string()) };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        optional(var).map_or(Ok(default), |raw| {
            raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
        })
    };

    let parse_i32 = |var: &str, default: i32| -> Result<i32, ConfigError> {
        optional(var).map_or(Ok(default), |raw| {
            raw.parse::<i32>().map_err(|e| invalid(var, e.to_string()))
        })
    };

    let base_url = or_default("JAVELIN_BASE_URL", DEFAULT_BASE_URL);
    let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
        base_url
    } else {
        problems.push(invalid(
            "JAVELIN_BASE_URL",
            format!("'{base_url}' is not an http(s) URL"),
        ));
        DEFAULT_BASE_URL.to_string()
    };

    let request_timeout_secs = parse_u64("STOCKSYNC_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)
        .and_then(|secs| {
            if secs == 0 {
                Err(invalid(
                    "STOCKSYNC_REQUEST_TIMEOUT_SECS",
                    "timeout must be at least one second".to_string(),
                ))
            } else {
                Ok(secs)
            }
        });
    let request_timeout_secs =
        accept_or_default(request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS, &mut problems);

    let display_utc_offset_minutes = parse_i32("STOCKSYNC_DISPLAY_UTC_OFFSET_MINUTES", 0).and_then(
        |minutes| {
            if minutes.abs() >= 24 * 60 {
                Err(invalid(
                    "STOCKSYNC_DISPLAY_UTC_OFFSET_MINUTES",
                    "offset must be within ±1439 minutes".to_string(),
                ))
            } else {
                Ok(minutes)
            }
        },
    );
    let display_utc_offset_minutes = accept_or_default(display_utc_offset_minutes, 0, &mut problems);

    let utc_offset_minutes = accept_or_default(
        parse_i32("JAVELIN_UTC_OFFSET_MINUTES", DEFAULT_JAVELIN_UTC_OFFSET_MINUTES),
        DEFAULT_JAVELIN_UTC_OFFSET_MINUTES,
        &mut problems,
    );

    let javelin = JavelinSettings {
        base_url,
        app_secret: optional("JAVELIN_APP_SECRET"),
        login_user: or_default("JAVELIN_LOGIN_USER", "STOCK_ADMIN"),
        login_password: optional("JAVELIN_LOGIN_PASSWORD"),
        client_id: or_default("JAVELIN_CLIENT_ID", "TORCH-ONLINE"),
        warehouse_id: or_default("JAVELIN_WAREHOUSE_ID", "DP01"),
        utc_offset_minutes,
        device_id: or_default("JAVELIN_DEVICE_ID", "1210110504"),
    };

    let config = AppConfig {
        spreadsheet_stock: optional("SPREADSHEET_STOCK"),
        spreadsheet_users: optional("SPREADSHEET_USERS"),
        google_credentials: optional("GOOGLE_CREDENTIALS"),
        service_account_path: PathBuf::from(or_default(
            "GOOGLE_SERVICE_ACCOUNT_PATH",
            "./service_account.json",
        )),
        javelin_cookie: optional("JAVELIN_COOKIE"),
        javelin,
        inventory_sheet: or_default("STOCKSYNC_INVENTORY_SHEET", "javelin"),
        marker_sheet: or_default("STOCKSYNC_MARKER_SHEET", "last_update"),
        config_sheet: or_default("STOCKSYNC_CONFIG_SHEET", "system_config"),
        display_utc_offset_minutes,
        request_timeout_secs,
        log_level: or_default("STOCKSYNC_LOG_LEVEL", "info"),
    };

    LoadedConfig { config, problems }
}

fn invalid(var: &str, reason: String) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    }
}

fn accept_or_default<T>(value: Result<T, ConfigError>, default: T, problems: &mut Vec<ConfigError>) -> T {
    value.unwrap_or_else(|problem| {
        problems.push(problem);
        default
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

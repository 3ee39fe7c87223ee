mod cookie_check;
mod diagnose;
mod refresh;

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stocksync_core::AppConfig;
use stocksync_javelin::JavelinClient;
use stocksync_sheets::GoogleSheetsClient;
use tracing_subscriber::EnvFilter;

pub(crate) const EXIT_SUCCESS: u8 = 0;
/// Any runtime failure, including a refresh that matched no records.
pub(crate) const EXIT_FAILURE: u8 = 1;
/// Missing required input. Same code clap uses for bad arguments.
pub(crate) const EXIT_USAGE: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "stocksync")]
#[command(about = "Sync Javelin warehouse inventory into Google Sheets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch inventory from Javelin and replace the inventory worksheet
    Refresh {
        /// Browser session cookie for the Javelin web app
        #[arg(env = "JAVELIN_COOKIE", hide_env_values = true)]
        cookie: Option<String>,
    },
    /// Check that a cookie opens a Javelin session and lists inventory
    TestCookie {
        /// Browser session cookie to test
        cookie: String,
    },
    /// Check credentials, settings and spreadsheet access before a refresh
    Diagnose,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Rejected values are reported by each command; diagnose still runs.
    let loaded = stocksync_core::load_app_config();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(loaded.config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let status = match cli.command {
        Commands::Refresh { cookie } => {
            refresh::run_refresh(loaded.into_result(), cookie.as_deref()).await
        }
        Commands::TestCookie { cookie } => match loaded.into_result() {
            Ok(config) => cookie_check::run_test_cookie(&config, &cookie).await,
            Err(e) => {
                eprintln!("ERROR: {e}");
                EXIT_FAILURE
            }
        },
        Commands::Diagnose => diagnose::run_diagnose(&loaded).await,
    };
    Ok(ExitCode::from(status))
}

/// Builds the vendor client from the configured shared login.
pub(crate) fn javelin_client(config: &AppConfig) -> anyhow::Result<JavelinClient> {
    let identity = config.javelin.login_identity()?;
    tracing::warn!(
        user_id = %identity.user_id,
        "logging in to Javelin with the shared integration identity, not a per-user account"
    );
    JavelinClient::new(&config.javelin, identity, config.request_timeout_secs)
        .context("failed to build Javelin client")
}

/// Authorizes against `SPREADSHEET_STOCK` with the configured service account.
pub(crate) async fn sheets_client(config: &AppConfig) -> anyhow::Result<GoogleSheetsClient> {
    let spreadsheet_id = config.require_spreadsheet_stock()?;
    let key = stocksync_core::load_service_account(&config.credential_source())?;
    GoogleSheetsClient::connect(&key, spreadsheet_id, config.request_timeout_secs)
        .await
        .context("failed to authorize with Google Sheets")
}

/// Prints the first `max` characters of a secret, for human confirmation.
pub(crate) fn preview(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let head: String = value.chars().take(max).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}

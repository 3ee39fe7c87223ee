//! The `test-cookie` command: one live pass through the vendor handshake
//! and inventory call, reporting each step as it happens.

use serde_json::Value;
use stocksync_core::AppConfig;
use stocksync_javelin::{has_session_part, JavelinClient, JavelinError, RawInventoryRecord, Step};

use crate::{javelin_client, preview, EXIT_FAILURE, EXIT_SUCCESS};

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordSample {
    pub product: String,
    pub description: String,
    pub quantity: String,
}

impl RecordSample {
    fn from_record(record: &RawInventoryRecord) -> Self {
        let field = |name: &str| match record.get(name) {
            None | Some(Value::Null) => NOT_AVAILABLE.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        Self {
            product: field("product_id"),
            description: field("description_1"),
            quantity: field("base_qty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CookieReport {
    pub user_id: String,
    pub record_count: usize,
    pub sample: Option<RecordSample>,
}

pub(crate) async fn run_test_cookie(config: &AppConfig, cookie: &str) -> u8 {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("JAVELIN COOKIE TEST");
    println!("{rule}");
    println!("Cookie length: {}", cookie.chars().count());
    println!("Cookie preview: {}", preview(cookie, 50));
    if !has_session_part(cookie) {
        println!("WARNING: cookie has no 'sess=' part; it may have been copied incompletely");
    }

    let client = match javelin_client(config) {
        Ok(client) => client,
        Err(e) => {
            println!("\nERROR: {e:#}");
            return EXIT_FAILURE;
        }
    };

    let outcome = check_cookie(&client, cookie).await;
    println!("\n{rule}");
    match outcome {
        Ok(report) => {
            println!(
                "COOKIE IS VALID: {} inventory records visible to {}",
                report.record_count, report.user_id
            );
            if let Some(sample) = &report.sample {
                println!("Sample data:");
                println!("  - Product: {}", sample.product);
                println!("  - Description: {}", sample.description);
                println!("  - Qty: {}", sample.quantity);
            }
            println!("{rule}");
            EXIT_SUCCESS
        }
        Err(e) => {
            println!("COOKIE TEST FAILED: {e}");
            println!("\nLikely causes:");
            for cause in likely_causes(&e) {
                println!("  - {cause}");
            }
            println!("{rule}");
            EXIT_FAILURE
        }
    }
}

/// Walks the three vendor calls, printing the outcome of each.
pub(crate) async fn check_cookie(
    client: &JavelinClient,
    cookie: &str,
) -> Result<CookieReport, JavelinError> {
    println!("\n1. Getting session code...");
    let (code, verifier) = client
        .request_code(cookie)
        .await
        .inspect_err(|e| println!("   FAILED: {e}"))?;
    println!("   OK, got code: {}", preview(&code, 20));

    println!("\n2. Logging in...");
    let session = client
        .login(cookie, &code, &verifier)
        .await
        .inspect_err(|e| println!("   FAILED: {e}"))?;
    println!("   OK, login successful");
    println!("   User ID: {}", session.user_id);
    println!("   Session Token: {}", preview(&session.session_token, 30));

    println!("\n3. Fetching inventory...");
    let records = client
        .fetch_inventory(&session, cookie)
        .await
        .inspect_err(|e| println!("   FAILED: {e}"))?;
    println!("   OK, got {} inventory records", records.len());

    Ok(CookieReport {
        user_id: session.user_id,
        record_count: records.len(),
        sample: records.first().map(RecordSample::from_record),
    })
}

/// Most likely explanations for `error`, most likely first.
pub(crate) fn likely_causes(error: &JavelinError) -> Vec<&'static str> {
    const EXPIRED: &str = "the cookie expired; log in to Javelin in a browser and copy a fresh one";
    const TRUNCATED: &str = "the cookie was truncated when copied (it should contain 'sess=')";
    const NETWORK: &str = "no network route to JAVELIN_BASE_URL, or the request timed out";
    const SHARED_LOGIN: &str = "JAVELIN_APP_SECRET or JAVELIN_LOGIN_PASSWORD is wrong";
    const VENDOR_CHANGED: &str = "the Javelin API changed its inventory response";

    match error {
        JavelinError::Authentication {
            step: Step::Login, ..
        } => vec![SHARED_LOGIN, EXPIRED, TRUNCATED],
        JavelinError::Authentication { .. } => vec![EXPIRED, TRUNCATED, NETWORK],
        JavelinError::Request { .. } | JavelinError::Client(_) | JavelinError::InvalidBaseUrl { .. } => {
            vec![NETWORK]
        }
        JavelinError::Fetch { .. }
        | JavelinError::MalformedEnvelope(_)
        | JavelinError::MalformedRecords(_) => vec![EXPIRED, VENDOR_CHANGED],
    }
}

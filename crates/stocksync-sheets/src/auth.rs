//! Service-account OAuth for the Sheets API.
//!
//! A JWT signed with the service-account private key (RS256) is exchanged at
//! the key's `token_uri` for a bearer token valid for one hour. A run lasts
//! seconds, so the token is fetched once per client and never refreshed.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use stocksync_core::ServiceAccountKey;

use crate::error::SheetsError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Signs the grant assertion for `key`, issued at `issued_at` (epoch seconds).
///
/// # Errors
///
/// Returns [`SheetsError::InvalidKey`] if the private key is not a usable
/// RSA PEM.
pub fn sign_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String, SheetsError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid.clone_from(&key.private_key_id);

    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: SHEETS_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(encode(&header, &claims, &encoding_key)?)
}

/// Exchanges a freshly signed assertion for an access token.
///
/// # Errors
///
/// - [`SheetsError::InvalidKey`] if the assertion cannot be signed.
/// - [`SheetsError::Http`] on network failure.
/// - [`SheetsError::Auth`] if the token endpoint refuses the grant or answers
///   without an `access_token`.
pub async fn fetch_access_token(
    client: &Client,
    key: &ServiceAccountKey,
) -> Result<String, SheetsError> {
    let assertion = sign_assertion(key, Utc::now().timestamp())?;

    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(SheetsError::Auth(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| SheetsError::Auth(format!("unreadable token response: {e}")))?;

    tracing::debug!(client_email = %key.client_email, "obtained Sheets access token");
    Ok(token.access_token)
}

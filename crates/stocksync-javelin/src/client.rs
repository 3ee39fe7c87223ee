//! HTTP client for the Javelin warehouse web application's internal API.
//!
//! The API is undocumented. A session is opened with a two-step handshake:
//! `GET /sess/code` trades the browser cookie for a `code`/`verifier` pair,
//! then `POST /v2/login` trades that pair plus the shared integration login
//! for a session triple. The triple authorizes `POST /v2/inventory_list`.
//! Without a cookie, the same handshake run with an operator's own login
//! answers with a fresh session cookie in `set-cookie`.
//!
//! Every call is made exactly once. There is no retry and no token reuse
//! across runs.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{header, Client, RequestBuilder, Response, Url};
use serde_json::Value;
use stocksync_core::{JavelinSettings, LoginIdentity};

use crate::cookie::clean_cookie;
use crate::error::{JavelinError, Step};
use crate::types::{
    InventoryParam, InventoryRequest, LoginRequest, RawInventoryRecord, SessionCredential,
};

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
const ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const APP_VERSION: &str = "JAVELIN Web";
const OS_VERSION: &str = "Windows 10";
const DEVICE_MODEL: &str = "Chrome 126.0.0.0";

/// Client for one Javelin tenant.
///
/// Use [`JavelinClient::new`] with settings from the environment; tests point
/// `settings.base_url` at a mock server.
pub struct JavelinClient {
    client: Client,
    base_url: Url,
    origin: String,
    identity: LoginIdentity,
    client_id: String,
    warehouse_id: String,
    utc_offset_minutes: i32,
    device_id: String,
}

impl JavelinClient {
    /// Creates a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`JavelinError::Client`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`JavelinError::InvalidBaseUrl`] if
    /// `settings.base_url` does not parse.
    pub fn new(
        settings: &JavelinSettings,
        identity: LoginIdentity,
        timeout_secs: u64,
    ) -> Result<Self, JavelinError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(BROWSER_UA)
            .build()?;

        let origin = settings.base_url.trim_end_matches('/').to_string();
        let base_url =
            Url::parse(&format!("{origin}/")).map_err(|e| JavelinError::InvalidBaseUrl {
                url: settings.base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            origin,
            identity,
            client_id: settings.client_id.clone(),
            warehouse_id: settings.warehouse_id.clone(),
            utc_offset_minutes: settings.utc_offset_minutes,
            device_id: settings.device_id.clone(),
        })
    }

    /// Runs the two-step handshake and returns a fresh session.
    ///
    /// # Errors
    ///
    /// - [`JavelinError::Authentication`] if either step answers with a
    ///   non-2xx status, a non-JSON body, or without the expected fields.
    /// - [`JavelinError::Request`] on network failure or timeout.
    pub async fn authenticate(&self, cookie: &str) -> Result<SessionCredential, JavelinError> {
        let (code, verifier) = self.request_code(cookie).await?;
        tracing::debug!("received session code and verifier");
        let credential = self.login(cookie, &code, &verifier).await?;
        tracing::info!(user_id = %credential.user_id, "javelin session established");
        Ok(credential)
    }

    /// Fetches the full inventory listing for the configured client and
    /// warehouse.
    ///
    /// The vendor wraps the records as a JSON string inside the `out_record`
    /// field, so the body is decoded twice; each decode has its own error.
    ///
    /// # Errors
    ///
    /// - [`JavelinError::Fetch`] on a non-2xx status or missing `out_record`.
    /// - [`JavelinError::MalformedEnvelope`] if the body is not JSON.
    /// - [`JavelinError::MalformedRecords`] if `out_record` is not a JSON
    ///   array of objects.
    /// - [`JavelinError::Request`] on network failure or timeout.
    pub async fn fetch_inventory(
        &self,
        credential: &SessionCredential,
        cookie: &str,
    ) -> Result<Vec<RawInventoryRecord>, JavelinError> {
        let cookie = clean_cookie(cookie);
        let url = self.endpoint("v2/inventory_list");
        let body = InventoryRequest {
            p_session_key: &credential.session_key,
            p_user_id: &credential.user_id,
            p_param: InventoryParam {
                client_id: &self.client_id,
                warehouse_id: &self.warehouse_id,
                utc_offset: self.utc_offset_minutes,
            },
        };

        let request = self
            .post(url, Some(&cookie))
            .header(header::AUTHORIZATION, &credential.session_token)
            .json(&body);
        let response = send(request, Step::Inventory).await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| JavelinError::Request {
                step: Step::Inventory,
                source,
            })?;

        if !status.is_success() {
            return Err(JavelinError::Fetch {
                reason: format!("HTTP {status}: {}", snippet(&text)),
            });
        }

        let envelope: Value = serde_json::from_str(&text).map_err(JavelinError::MalformedEnvelope)?;
        let records = decode_out_record(&envelope)?;
        tracing::info!(
            records = records.len(),
            warehouse = %self.warehouse_id,
            "fetched javelin inventory"
        );
        Ok(records)
    }

    /// Handshake step one: trades the cookie for a `(code, verifier)` pair.
    ///
    /// # Errors
    ///
    /// Same as [`JavelinClient::authenticate`], attributed to [`Step::Code`].
    pub async fn request_code(&self, cookie: &str) -> Result<(String, String), JavelinError> {
        self.code_pair(Some(&clean_cookie(cookie))).await
    }

    /// Handshake step two: trades the code pair and the shared login for a
    /// session.
    ///
    /// # Errors
    ///
    /// Same as [`JavelinClient::authenticate`], attributed to [`Step::Login`].
    pub async fn login(
        &self,
        cookie: &str,
        code: &str,
        verifier: &str,
    ) -> Result<SessionCredential, JavelinError> {
        let cookie = clean_cookie(cookie);
        let request = self.login_request(
            Some(&cookie),
            code,
            verifier,
            &self.identity.user_id,
            &self.identity.password,
        );
        let body = read_auth_json(send(request, Step::Login).await?, Step::Login).await?;

        Ok(SessionCredential {
            user_id: required_field(&body, "p_user_id", Step::Login)?,
            session_key: required_field(&body, "p_session_key", Step::Login)?,
            session_token: required_field(&body, "p_session_token", Step::Login)?,
        })
    }

    /// Runs the handshake without a cookie, as `user_id`/`password`, and
    /// returns the session cookie the login response sets.
    ///
    /// The returned value holds the `name=value` pairs of every `set-cookie`
    /// header joined with `; `, ready for [`JavelinClient::authenticate`].
    ///
    /// # Errors
    ///
    /// - [`JavelinError::Authentication`] if either step answers with a
    ///   non-2xx status, or the login response sets no cookie.
    /// - [`JavelinError::Request`] on network failure or timeout.
    pub async fn login_with_password(
        &self,
        user_id: &str,
        password: &str,
    ) -> Result<String, JavelinError> {
        let (code, verifier) = self.code_pair(None).await?;
        let request = self.login_request(None, &code, &verifier, user_id, password);
        let response = send(request, Step::Login).await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(JavelinError::Authentication {
                step: Step::Login,
                reason: format!("HTTP {status}: {}", snippet(&text)),
            });
        }

        let cookie = session_cookie(response.headers());
        if cookie.is_empty() {
            return Err(JavelinError::Authentication {
                step: Step::Login,
                reason: "response did not set a session cookie".to_string(),
            });
        }
        tracing::info!(user_id, "javelin login issued a session cookie");
        Ok(cookie)
    }

    async fn code_pair(&self, cookie: Option<&str>) -> Result<(String, String), JavelinError> {
        let mut url = self.endpoint("sess/code");
        url.query_pairs_mut()
            .append_pair("c", &chrono::Utc::now().timestamp_millis().to_string());

        let mut request = self
            .client
            .get(url)
            .header(header::ACCEPT, ACCEPT)
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header("x-requested-with", "XMLHttpRequest");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let body = read_auth_json(send(request, Step::Code).await?, Step::Code).await?;

        let code = required_field(&body, "code", Step::Code)?;
        let verifier = required_field(&body, "verifier", Step::Code)?;
        Ok((code, verifier))
    }

    fn login_request(
        &self,
        cookie: Option<&str>,
        code: &str,
        verifier: &str,
        user_id: &str,
        password: &str,
    ) -> RequestBuilder {
        let body = LoginRequest {
            p_session_key: "",
            p_user_id: "",
            code,
            verifier,
            user_id,
            password,
            app_version: APP_VERSION,
            os_version: OS_VERSION,
            device_model: DEVICE_MODEL,
            device_id: &self.device_id,
            wsade: "0",
            wsade_code: "",
            utc_offset: self.utc_offset_minutes.to_string(),
        };

        self.post(self.endpoint("v2/login"), cookie)
            .header(header::AUTHORIZATION, &self.identity.app_secret)
            .json(&body)
    }

    fn post(&self, url: Url, cookie: Option<&str>) -> RequestBuilder {
        let request = self
            .client
            .post(url)
            .header(header::ACCEPT, ACCEPT)
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(header::ORIGIN, &self.origin)
            .header("x-requested-with", "XMLHttpRequest");
        match cookie {
            Some(cookie) => request.header(header::COOKIE, cookie),
            None => request,
        }
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("{}{path}", self.base_url.path()));
        url
    }
}

async fn send(request: RequestBuilder, step: Step) -> Result<Response, JavelinError> {
    request
        .send()
        .await
        .map_err(|source| JavelinError::Request { step, source })
}

/// Checks the status of a handshake response and parses its JSON body.
async fn read_auth_json(response: Response, step: Step) -> Result<Value, JavelinError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|source| JavelinError::Request { step, source })?;

    if !status.is_success() {
        return Err(JavelinError::Authentication {
            step,
            reason: format!("HTTP {status}: {}", snippet(&text)),
        });
    }

    serde_json::from_str(&text).map_err(|e| JavelinError::Authentication {
        step,
        reason: format!("response is not valid JSON: {e}"),
    })
}

/// `name=value` pairs of every `set-cookie` header, joined with `; `.
fn session_cookie(headers: &HeaderMap) -> String {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Reads a non-empty string (or number) field from a handshake response.
fn required_field(body: &Value, field: &str, step: Step) -> Result<String, JavelinError> {
    let value = match body.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    value.ok_or_else(|| JavelinError::Authentication {
        step,
        reason: format!("response missing `{field}`"),
    })
}

/// Second decode of the inventory response: `out_record` holds the record
/// array as a JSON string. An already-decoded array is accepted as well.
fn decode_out_record(envelope: &Value) -> Result<Vec<RawInventoryRecord>, JavelinError> {
    match envelope.get("out_record") {
        Some(Value::String(inner)) => {
            serde_json::from_str(inner).map_err(JavelinError::MalformedRecords)
        }
        Some(array @ Value::Array(_)) => {
            serde_json::from_value(array.clone()).map_err(JavelinError::MalformedRecords)
        }
        Some(Value::Null) | None => Err(JavelinError::Fetch {
            reason: "response missing `out_record`".to_string(),
        }),
        Some(other) => Err(JavelinError::Fetch {
            reason: format!("`out_record` has unexpected type: {}", snippet(&other.to_string())),
        }),
    }
}

/// First 200 characters of a response body, for error messages.
fn snippet(text: &str) -> String {
    const MAX: usize = 200;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX).collect();
        format!("{head}...")
    }
}

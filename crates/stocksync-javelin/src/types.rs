//! Javelin API payload and session types.

use serde::Serialize;

/// One vendor stock line, exactly as returned.
///
/// The schema is whatever the vendor sends; fields may be absent or null.
pub type RawInventoryRecord = serde_json::Map<String, serde_json::Value>;

/// Transient identity obtained from the login handshake. Never persisted.
#[derive(Clone)]
pub struct SessionCredential {
    pub user_id: String,
    pub session_key: String,
    pub session_token: String,
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("user_id", &self.user_id)
            .field("session_key", &"[redacted]")
            .field("session_token", &"[redacted]")
            .finish()
    }
}

/// Body of `POST /v2/login`.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub p_session_key: &'a str,
    pub p_user_id: &'a str,
    pub code: &'a str,
    pub verifier: &'a str,
    pub user_id: &'a str,
    pub password: &'a str,
    pub app_version: &'a str,
    pub os_version: &'a str,
    pub device_model: &'a str,
    pub device_id: &'a str,
    pub wsade: &'a str,
    pub wsade_code: &'a str,
    pub utc_offset: String,
}

/// Body of `POST /v2/inventory_list`.
#[derive(Debug, Serialize)]
pub(crate) struct InventoryRequest<'a> {
    pub p_session_key: &'a str,
    pub p_user_id: &'a str,
    pub p_param: InventoryParam<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct InventoryParam<'a> {
    pub client_id: &'a str,
    pub warehouse_id: &'a str,
    pub utc_offset: i32,
}

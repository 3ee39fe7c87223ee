use std::path::PathBuf;

use crate::credentials::CredentialSource;
use crate::ConfigError;

/// Static settings of the Javelin vendor integration.
///
/// The shared secret and the login password are the same for every caller;
/// they identify the integration, not the person running it.
#[derive(Clone)]
pub struct JavelinSettings {
    pub base_url: String,
    pub app_secret: Option<String>,
    pub login_user: String,
    pub login_password: Option<String>,
    pub client_id: String,
    pub warehouse_id: String,
    pub utc_offset_minutes: i32,
    pub device_id: String,
}

impl JavelinSettings {
    /// Returns the shared login identity, or the first missing variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `JAVELIN_APP_SECRET` or
    /// `JAVELIN_LOGIN_PASSWORD` is not set.
    pub fn login_identity(&self) -> Result<LoginIdentity, ConfigError> {
        let app_secret = self
            .app_secret
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("JAVELIN_APP_SECRET".to_string()))?;
        let password = self
            .login_password
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("JAVELIN_LOGIN_PASSWORD".to_string()))?;
        Ok(LoginIdentity {
            user_id: self.login_user.clone(),
            password,
            app_secret,
        })
    }
}

impl std::fmt::Debug for JavelinSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JavelinSettings")
            .field("base_url", &self.base_url)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .field("login_user", &self.login_user)
            .field(
                "login_password",
                &self.login_password.as_ref().map(|_| "[redacted]"),
            )
            .field("client_id", &self.client_id)
            .field("warehouse_id", &self.warehouse_id)
            .field("utc_offset_minutes", &self.utc_offset_minutes)
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// Shared operational login used for the `/v2/login` step.
#[derive(Clone)]
pub struct LoginIdentity {
    pub user_id: String,
    pub password: String,
    pub app_secret: String,
}

impl std::fmt::Debug for LoginIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginIdentity")
            .field("user_id", &self.user_id)
            .field("password", &"[redacted]")
            .field("app_secret", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub spreadsheet_stock: Option<String>,
    pub spreadsheet_users: Option<String>,
    pub google_credentials: Option<String>,
    pub service_account_path: PathBuf,
    pub javelin_cookie: Option<String>,
    pub javelin: JavelinSettings,
    pub inventory_sheet: String,
    pub marker_sheet: String,
    pub config_sheet: String,
    /// Offset applied when rendering vendor epoch timestamps; `0` renders UTC.
    pub display_utc_offset_minutes: i32,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl AppConfig {
    /// Where the service-account key should be read from.
    ///
    /// Inline `GOOGLE_CREDENTIALS` wins over the key file path.
    #[must_use]
    pub fn credential_source(&self) -> CredentialSource {
        match &self.google_credentials {
            Some(json) => CredentialSource::Inline(json.clone()),
            None => CredentialSource::File(self.service_account_path.clone()),
        }
    }

    /// The inventory spreadsheet id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `SPREADSHEET_STOCK` is unset.
    pub fn require_spreadsheet_stock(&self) -> Result<&str, ConfigError> {
        self.spreadsheet_stock
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("SPREADSHEET_STOCK".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("spreadsheet_stock", &self.spreadsheet_stock)
            .field("spreadsheet_users", &self.spreadsheet_users)
            .field(
                "google_credentials",
                &self.google_credentials.as_ref().map(|_| "[redacted]"),
            )
            .field("service_account_path", &self.service_account_path)
            .field(
                "javelin_cookie",
                &self.javelin_cookie.as_ref().map(|_| "[redacted]"),
            )
            .field("javelin", &self.javelin)
            .field("inventory_sheet", &self.inventory_sheet)
            .field("marker_sheet", &self.marker_sheet)
            .field("config_sheet", &self.config_sheet)
            .field(
                "display_utc_offset_minutes",
                &self.display_utc_offset_minutes,
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_level", &self.log_level)
            .finish()
    }
}

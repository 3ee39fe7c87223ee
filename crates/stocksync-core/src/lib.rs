mod app_config;
mod config;
mod credentials;

use thiserror::Error;

pub use app_config::{AppConfig, JavelinSettings, LoginIdentity};
pub use config::{load_app_config, load_app_config_from_env, LoadedConfig};
pub use credentials::{
    load_service_account, CredentialSource, ServiceAccountKey, DEFAULT_TOKEN_URI,
    REQUIRED_SERVICE_ACCOUNT_KEYS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("cannot read service account credentials from {location}: {reason}")]
    CredentialsUnreadable { location: String, reason: String },

    #[error("service account credentials are not valid JSON: {0}")]
    CredentialsInvalid(#[source] serde_json::Error),

    #[error("service account credentials missing keys: {}", .0.join(", "))]
    CredentialsMissingKeys(Vec<String>),
}

use thiserror::Error;

/// Errors returned by spreadsheet sinks.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// The service-account token exchange failed.
    #[error("Google authentication failed: {0}")]
    Auth(String),

    /// The private key in the service-account JSON could not be used to sign.
    #[error("invalid service account key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Sheets API answered with a non-2xx status.
    #[error("Sheets API returned {status} for {operation}: {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A key/value worksheet lacks its `config_key` or `config_value` header.
    #[error("worksheet '{0}' has no config_key/config_value header row")]
    ConfigLayout(String),

    #[error("worksheet '{0}' not found")]
    WorksheetNotFound(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

use thiserror::Error;

/// The vendor call an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `GET /sess/code`: code and verifier issuance.
    Code,
    /// `POST /v2/login`: session token exchange.
    Login,
    /// `POST /v2/inventory_list`.
    Inventory,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Code => write!(f, "session code"),
            Step::Login => write!(f, "login"),
            Step::Inventory => write!(f, "inventory list"),
        }
    }
}

/// Errors returned by the Javelin API client.
#[derive(Debug, Error)]
pub enum JavelinError {
    /// The handshake returned a non-2xx status or lacked an expected field.
    #[error("authentication failed at {step} step: {reason}")]
    Authentication { step: Step, reason: String },

    /// The inventory call returned a non-2xx status or no `out_record`.
    #[error("inventory fetch failed: {reason}")]
    Fetch { reason: String },

    /// The outer inventory response body is not JSON.
    #[error("inventory response is not valid JSON: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    /// `out_record` decoded, but its content is not a JSON array of records.
    #[error("inventory out_record is not a valid record array: {0}")]
    MalformedRecords(#[source] serde_json::Error),

    /// Network or TLS failure while talking to the vendor.
    #[error("request to {step} endpoint failed: {source}")]
    Request {
        step: Step,
        #[source]
        source: reqwest::Error,
    },

    /// The underlying `reqwest::Client` could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}


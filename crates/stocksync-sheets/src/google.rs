//! Google Sheets v4 REST client.

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use stocksync_core::ServiceAccountKey;

use crate::auth::fetch_access_token;
use crate::error::SheetsError;
use crate::sink::{SpreadsheetSink, WorksheetSize};

const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/";
const METADATA_FIELDS: &str =
    "properties.title,sheets.properties(sheetId,title,gridProperties(rowCount,columnCount))";
const USER_AGENT: &str = concat!("stocksync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
pub struct SpreadsheetMetadata {
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpreadsheetProperties {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetEntry {
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub grid_properties: GridProperties,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub column_count: u32,
}

impl SpreadsheetMetadata {
    /// Worksheet titles in tab order.
    #[must_use]
    pub fn worksheet_titles(&self) -> Vec<&str> {
        self.sheets
            .iter()
            .map(|s| s.properties.title.as_str())
            .collect()
    }

    fn worksheet(&self, name: &str) -> Option<&SheetProperties> {
        self.sheets
            .iter()
            .map(|s| &s.properties)
            .find(|p| p.title == name)
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Authorized handle on one spreadsheet.
pub struct GoogleSheetsClient {
    client: Client,
    api_base: Url,
    spreadsheet_id: String,
    access_token: String,
}

impl std::fmt::Debug for GoogleSheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsClient")
            .field("api_base", &self.api_base.as_str())
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("access_token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl GoogleSheetsClient {
    /// Authorizes against the production Sheets API.
    ///
    /// # Errors
    ///
    /// See [`GoogleSheetsClient::connect_with_base_url`].
    pub async fn connect(
        key: &ServiceAccountKey,
        spreadsheet_id: &str,
        timeout_secs: u64,
    ) -> Result<Self, SheetsError> {
        Self::connect_with_base_url(key, spreadsheet_id, timeout_secs, DEFAULT_API_BASE).await
    }

    /// Authorizes against a Sheets API at `api_base`. Tests use this to
    /// point the client at a mock server.
    ///
    /// # Errors
    ///
    /// - [`SheetsError::InvalidBaseUrl`] if `api_base` is not a hierarchical URL.
    /// - [`SheetsError::Http`] if the HTTP client cannot be built or the token
    ///   endpoint is unreachable.
    /// - [`SheetsError::InvalidKey`] / [`SheetsError::Auth`] if the token
    ///   exchange fails.
    pub async fn connect_with_base_url(
        key: &ServiceAccountKey,
        spreadsheet_id: &str,
        timeout_secs: u64,
        api_base: &str,
    ) -> Result<Self, SheetsError> {
        let api_base = Url::parse(api_base).map_err(|e| SheetsError::InvalidBaseUrl {
            url: api_base.to_string(),
            reason: e.to_string(),
        })?;
        if api_base.cannot_be_a_base() {
            return Err(SheetsError::InvalidBaseUrl {
                url: api_base.to_string(),
                reason: "URL cannot carry a path".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        let access_token = fetch_access_token(&client, key).await?;

        Ok(Self {
            client,
            api_base,
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token,
        })
    }

    #[must_use]
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Title and worksheet list of the spreadsheet.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError::Api`] if the spreadsheet does not exist or is
    /// not shared with the service account.
    pub async fn metadata(&self) -> Result<SpreadsheetMetadata, SheetsError> {
        let mut url = self.url(&[self.spreadsheet_id.clone()])?;
        url.query_pairs_mut().append_pair("fields", METADATA_FIELDS);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        read_json(checked(response, "get spreadsheet").await?, "spreadsheet metadata").await
    }

    async fn worksheet(&self, name: &str) -> Result<SheetProperties, SheetsError> {
        self.metadata()
            .await?
            .worksheet(name)
            .cloned()
            .ok_or_else(|| SheetsError::WorksheetNotFound(name.to_string()))
    }

    async fn batch_update(&self, requests: Vec<Value>, operation: &str) -> Result<(), SheetsError> {
        let url = self.url(&[format!("{}:batchUpdate", self.spreadsheet_id)])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "requests": requests }))
            .send()
            .await?;
        checked(response, operation).await?;
        Ok(())
    }

    /// Appends rows and columns so the grid holds at least `needed`.
    async fn ensure_capacity(&self, name: &str, needed: WorksheetSize) -> Result<(), SheetsError> {
        let sheet = self.worksheet(name).await?;
        let grid = sheet.grid_properties;

        let mut requests = Vec::new();
        if needed.rows > grid.row_count {
            requests.push(append_dimension(sheet.sheet_id, "ROWS", needed.rows - grid.row_count));
        }
        if needed.columns > grid.column_count {
            requests.push(append_dimension(
                sheet.sheet_id,
                "COLUMNS",
                needed.columns - grid.column_count,
            ));
        }
        if requests.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            worksheet = name,
            rows = needed.rows,
            columns = needed.columns,
            "growing worksheet grid"
        );
        self.batch_update(requests, "grow worksheet").await
    }

    fn url(&self, segments: &[String]) -> Result<Url, SheetsError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| SheetsError::InvalidBaseUrl {
                url: self.api_base.to_string(),
                reason: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, range: &str) -> Result<Url, SheetsError> {
        self.url(&[
            self.spreadsheet_id.clone(),
            "values".to_string(),
            range.to_string(),
        ])
    }
}

impl SpreadsheetSink for GoogleSheetsClient {
    async fn ensure_worksheet(&self, name: &str, size: WorksheetSize) -> Result<bool, SheetsError> {
        if self.metadata().await?.worksheet(name).is_some() {
            return Ok(false);
        }

        let request = json!({
            "addSheet": {
                "properties": {
                    "title": name,
                    "gridProperties": { "rowCount": size.rows, "columnCount": size.columns }
                }
            }
        });
        self.batch_update(vec![request], "add worksheet").await?;
        tracing::info!(worksheet = name, rows = size.rows, columns = size.columns, "created worksheet");
        Ok(true)
    }

    async fn clear(&self, name: &str) -> Result<(), SheetsError> {
        let url = self.values_url(&format!("{}:clear", quote_sheet_name(name)))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({}))
            .send()
            .await?;
        checked(response, "clear values").await?;
        Ok(())
    }

    async fn read_all(&self, name: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.values_url(&quote_sheet_name(name))?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let range: ValueRange = read_json(checked(response, "get values").await?, "value range").await?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn write_rows(&self, name: &str, rows: &[Vec<String>]) -> Result<(), SheetsError> {
        if rows.is_empty() {
            return Ok(());
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        self.ensure_capacity(name, WorksheetSize::new(0, 0).covering(rows.len(), width))
            .await?;

        let range = format!("{}!A1", quote_sheet_name(name));
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": rows }))
            .send()
            .await?;
        checked(response, "update values").await?;
        tracing::debug!(worksheet = name, rows = rows.len(), "wrote rows");
        Ok(())
    }
}

/// A1-notation sheet reference: single-quoted, embedded quotes doubled.
#[must_use]
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

fn append_dimension(sheet_id: i64, dimension: &str, length: u32) -> Value {
    json!({
        "appendDimension": { "sheetId": sheet_id, "dimension": dimension, "length": length }
    })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn checked(response: Response, operation: &str) -> Result<Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SheetsError::Api {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T, SheetsError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| SheetsError::Deserialize {
        context: context.to_string(),
        source,
    })
}

//! Integration tests for `GoogleSheetsClient` against a wiremock Sheets API.

use serde_json::json;
use stocksync_core::ServiceAccountKey;
use stocksync_sheets::{
    replace_sheet, update_marker, GoogleSheetsClient, SheetsError, SpreadsheetSink, WorksheetSize,
    JAVELIN_MARKER_KEY,
};
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, path_regex, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIVATE_KEY: &str = include_str!("fixtures/test_rsa_private.pem");
const SPREADSHEET: &str = "sheet-123";
const BEARER: &str = "Bearer ya29.test-token";

fn service_account(server: &MockServer) -> ServiceAccountKey {
    ServiceAccountKey {
        client_email: "sync@stock-reports.iam.gserviceaccount.com".to_string(),
        private_key: PRIVATE_KEY.to_string(),
        project_id: "stock-reports".to_string(),
        private_key_id: Some("kid-1".to_string()),
        token_uri: format!("{}/token", server.uri()),
    }
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("jwt-bearer"))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

async fn mount_metadata(server: &MockServer, sheets: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SPREADSHEET}")))
        .and(header("authorization", BEARER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": { "title": "Stock Report" },
            "sheets": sheets
        })))
        .mount(server)
        .await;
}

fn sheet_entry(id: i64, title: &str, rows: u32, columns: u32) -> serde_json::Value {
    json!({ "properties": {
        "sheetId": id,
        "title": title,
        "gridProperties": { "rowCount": rows, "columnCount": columns }
    }})
}

async fn connect(server: &MockServer) -> GoogleSheetsClient {
    GoogleSheetsClient::connect_with_base_url(&service_account(server), SPREADSHEET, 5, &server.uri())
        .await
        .expect("client should authorize")
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| (*c).to_string()).collect()
}

#[tokio::test]
async fn metadata_lists_title_and_worksheets() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_metadata(
        &server,
        json!([sheet_entry(0, "javelin", 1000, 30), sheet_entry(7, "system_config", 100, 5)]),
    )
    .await;

    let client = connect(&server).await;
    let meta = client.metadata().await.unwrap();

    assert_eq!(meta.properties.title, "Stock Report");
    assert_eq!(meta.worksheet_titles(), vec!["javelin", "system_config"]);
}

#[tokio::test]
async fn token_refusal_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
        .mount(&server)
        .await;

    let err = GoogleSheetsClient::connect_with_base_url(
        &service_account(&server),
        SPREADSHEET,
        5,
        &server.uri(),
    )
    .await
    .unwrap_err();

    assert!(
        matches!(err, SheetsError::Auth(ref reason) if reason.contains("invalid_grant")),
        "got {err:?}"
    );
}

#[tokio::test]
async fn unshared_spreadsheet_is_api_error() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SPREADSHEET}")))
        .respond_with(ResponseTemplate::new(403).set_body_string("The caller does not have permission"))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let err = client.metadata().await.unwrap_err();
    assert!(matches!(err, SheetsError::Api { status: 403, .. }), "got {err:?}");
}

#[tokio::test]
async fn replace_existing_sheet_clears_then_writes_raw() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_metadata(&server, json!([sheet_entry(0, "javelin", 1000, 30)])).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-123/values/.*javelin.*:clear$"))
        .and(header("authorization", BEARER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-123/values/.*javelin.*!A1$"))
        .and(query_param("valueInputOption", "RAW"))
        .and(body_partial_json(json!({
            "majorDimension": "ROWS",
            "values": [["Product ID", "Base Qty"], ["A", "010"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updatedRows": 2 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r":batchUpdate$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let written = replace_sheet(
        &client,
        "javelin",
        &row(&["Product ID", "Base Qty"]),
        &[row(&["A", "010"])],
    )
    .await
    .unwrap();

    assert_eq!(written, 1);
}

#[tokio::test]
async fn missing_worksheet_is_added_with_requested_grid() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_metadata(&server, json!([sheet_entry(0, "Sheet1", 1000, 26)])).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-123:batchUpdate$"))
        .and(body_partial_json(json!({
            "requests": [{ "addSheet": { "properties": {
                "title": "last_update",
                "gridProperties": { "rowCount": 10, "columnCount": 2 }
            }}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let created = client
        .ensure_worksheet("last_update", WorksheetSize::new(10, 2))
        .await
        .unwrap();
    assert!(created);
}

#[tokio::test]
async fn small_grid_is_grown_before_write() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_metadata(&server, json!([sheet_entry(7, "last_update", 2, 2)])).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-123:batchUpdate$"))
        .and(body_partial_json(json!({
            "requests": [{ "appendDimension": { "sheetId": 7, "dimension": "ROWS", "length": 1 } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-123/values/.*last_update.*!A1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    client
        .write_rows(
            "last_update",
            &[row(&["type", "last_update"]), row(&["ERP", "-"]), row(&["Javelin", "t"])],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn read_all_handles_empty_range() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-123/values/.*system_config.*$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "range": "system_config!A1:Z1000", "majorDimension": "ROWS" })),
        )
        .mount(&server)
        .await;

    let client = connect(&server).await;
    assert!(client.read_all("system_config").await.unwrap().is_empty());
}

#[tokio::test]
async fn marker_update_keeps_erp_over_http() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_metadata(&server, json!([sheet_entry(7, "last_update", 10, 2)])).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-123/values/.*last_update.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["type", "last_update"], ["ERP", "X"]]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r":clear$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-123/values/.*last_update.*!A1$"))
        .and(body_partial_json(json!({
            "values": [["type", "last_update"], ["ERP", "X"], ["Javelin", "05 Mar 2025, 14:07"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    assert!(update_marker(&client, "last_update", JAVELIN_MARKER_KEY, "05 Mar 2025, 14:07").await);
}

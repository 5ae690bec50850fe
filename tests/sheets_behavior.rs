//! Behavior-driven tests for the Google Sheets surface
//!
//! These tests publish through a service-account credential file against a
//! canned Sheets API and check the calls a spreadsheet would receive.

use std::fs;

use netflow_core::{HttpMethod, HttpResponse, ScanResult, StaticHttpClient, Symbol};
use netflow_report::{
    NumberFormat, ReportError, ReportSink, ServiceAccountAuth, ServiceAccountKey, SheetsSurface,
    TokenSource,
};
use netflow_tests::{at, Arc};
use serde_json::{json, Value};
use tempfile::tempdir;

const PRIVATE_KEY: &str = include_str!("../crates/netflow-report/testdata/service_account.pem");

fn credential_file(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("service-account.json");
    let key = json!({
        "type": "service_account",
        "project_id": "netflow-test",
        "private_key_id": "kid-7",
        "private_key": PRIVATE_KEY,
        "client_email": "reporter@netflow-test.iam.gserviceaccount.com",
        "token_uri": "https://oauth.test/token"
    });
    fs::write(&path, key.to_string()).expect("write credentials");
    path
}

fn sheets_api() -> StaticHttpClient {
    StaticHttpClient::new()
        .route(
            "oauth.test/token",
            HttpResponse::ok_json(r#"{"access_token":"ya29.sheets","expires_in":3599}"#),
        )
        .route(
            "?fields=",
            HttpResponse::ok_json(
                r#"{"sheets":[{"properties":{"sheetId":42,"title":"2024-01-Binance-NetInflow"}}]}"#,
            ),
        )
        .route(":batchUpdate", HttpResponse::ok_json(r#"{"replies":[{}]}"#))
        .route("/values/", HttpResponse::ok_json("{}"))
}

fn body(request: &netflow_core::HttpRequest) -> Value {
    serde_json::from_str(request.body.as_deref().unwrap_or("null")).expect("json body")
}

#[tokio::test]
async fn publishing_inserts_rows_then_formats_them() {
    // Given: a credential file and a spreadsheet that already has January's sheet
    let temp = tempdir().expect("tempdir");
    let key = ServiceAccountKey::from_file(&credential_file(temp.path())).expect("key");
    let http = Arc::new(sheets_api());
    let auth = ServiceAccountAuth::new(key, http.clone(), 1_000).expect("auth");
    let surface = SheetsSurface::new(http.clone(), Arc::new(auth), "spreadsheet-1")
        .base_url("https://sheets.test/v4/spreadsheets");
    let sink = ReportSink::new(Arc::new(surface));

    // When: one result is published
    let now = at("2024-01-15T09:00:00Z");
    let result = ScanResult {
        time: now,
        symbol: Symbol::parse("BTCUSDT").expect("symbol"),
        price: 42_000.5,
        amount: 900_000_000.0,
        buy_volume: 100.0,
        sell_volume: 40.0,
        net_inflow: 60.0,
        money_flow: Some(0.125),
        stop_loss: Some(39_900.48),
    };
    sink.publish(&[result], now).await.expect("publish");

    // Then: one token exchange, then lookup, insert, write and two formats
    let requests = http.recorded_requests();
    assert_eq!(requests.len(), 6);
    assert!(requests[0].url.contains("oauth.test/token"));
    assert!(requests[1..]
        .iter()
        .all(|r| r.headers.get("authorization").map(String::as_str) == Some("Bearer ya29.sheets")));

    let insert = body(&requests[2]);
    assert_eq!(insert["requests"][0]["insertDimension"]["range"]["sheetId"], 42);
    assert_eq!(insert["requests"][0]["insertDimension"]["range"]["startIndex"], 2);
    assert_eq!(insert["requests"][0]["insertDimension"]["range"]["endIndex"], 5);

    assert_eq!(requests[3].method, HttpMethod::Put);
    let values = body(&requests[3]);
    assert_eq!(values["range"], "'2024-01-Binance-NetInflow'!A3");
    assert_eq!(values["values"][0][0], "Time");
    assert_eq!(values["values"][1][1], "BTCUSDT");
    assert_eq!(values["values"][1][6], 60.0);
    assert_eq!(values["values"][2], json!([]));

    let millions = &body(&requests[4])["requests"][0]["repeatCell"];
    assert_eq!(millions["range"]["startRowIndex"], 3);
    assert_eq!(millions["range"]["endRowIndex"], 4);
    assert_eq!(millions["range"]["startColumnIndex"], 3);
    assert_eq!(millions["range"]["endColumnIndex"], 7);
    let currency = &body(&requests[5])["requests"][0]["repeatCell"];
    assert_eq!(currency["range"]["startColumnIndex"], 8);
    assert_eq!(
        currency["cell"]["userEnteredFormat"]["numberFormat"]["pattern"],
        NumberFormat::Currency.pattern()
    );
}

#[tokio::test]
async fn a_rejected_credential_fails_before_any_sheet_call() {
    // Given: the token endpoint refuses the service account
    let temp = tempdir().expect("tempdir");
    let key = ServiceAccountKey::from_file(&credential_file(temp.path())).expect("key");
    let http = Arc::new(StaticHttpClient::new().route(
        "oauth.test/token",
        HttpResponse::new(401, r#"{"error":"invalid_client"}"#),
    ));
    let auth = ServiceAccountAuth::new(key, http.clone(), 1_000).expect("auth");

    // When: startup asks for the first token
    let err = auth.token().await.expect_err("must fail");

    // Then: it is an authentication error and nothing else was called
    assert!(matches!(err, ReportError::Auth(ref message) if message.contains("invalid_client")));
    assert_eq!(http.recorded_requests().len(), 1);
}

#[test]
fn a_missing_credential_file_is_an_io_error() {
    // Given: a path with no file behind it
    let temp = tempdir().expect("tempdir");

    // When: the key is loaded
    let err = ServiceAccountKey::from_file(&temp.path().join("absent.json")).expect_err("must fail");

    // Then: the caller sees an I/O error
    assert!(matches!(err, ReportError::Io(_)));
}

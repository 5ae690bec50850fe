use std::sync::Arc;

use netflow_core::http_client::DEFAULT_TIMEOUT_MS;
use netflow_core::{HttpClient, HttpRequest};
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::TokenSource;
use crate::surface::{
    column_letter, normalize_rows, Cell, CellRange, NumberFormat, ReportSurface, SheetHandle,
    SurfaceFuture, DEFAULT_SHEET_COLUMNS, DEFAULT_SHEET_ROWS, HEADER_ROWS,
};
use crate::ReportError;

pub const DEFAULT_SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets v4 surface over one spreadsheet.
#[derive(Clone)]
pub struct SheetsSurface {
    http_client: Arc<dyn HttpClient>,
    auth: Arc<dyn TokenSource>,
    spreadsheet_id: String,
    base_url: String,
    timeout_ms: u64,
}

impl SheetsSurface {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        auth: Arc<dyn TokenSource>,
        spreadsheet_id: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            base_url: String::from(DEFAULT_SHEETS_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn spreadsheet_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id)
        )
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(range))
    }

    async fn send(&self, request: HttpRequest) -> Result<String, ReportError> {
        let token = self.auth.token().await?;
        let request = request
            .with_bearer_token(&token)
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(ReportError::Upstream {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response.body)
    }

    async fn batch_update(&self, requests: Value) -> Result<Value, ReportError> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = json!({ "requests": requests });
        let response = self
            .send(HttpRequest::post(url).with_json_body(body.to_string()))
            .await?;
        Ok(serde_json::from_str(&response)?)
    }

    async fn update_values(&self, range: &str, rows: &[Vec<Cell>]) -> Result<(), ReportError> {
        let values: Vec<Vec<Value>> = rows
            .iter()
            .map(|row| row.iter().map(Cell::to_json).collect())
            .collect();
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });
        let url = format!("{}?valueInputOption=RAW", self.values_url(range));
        self.send(HttpRequest::put(url).with_json_body(body.to_string()))
            .await?;
        Ok(())
    }

    async fn find_sheet(&self, title: &str) -> Result<Option<SheetHandle>, ReportError> {
        let url = format!(
            "{}?fields={}",
            self.spreadsheet_url(),
            urlencoding::encode("sheets.properties(sheetId,title)")
        );
        let body = self.send(HttpRequest::get(url)).await?;
        let metadata: SpreadsheetMetadata = serde_json::from_str(&body)?;

        Ok(metadata
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties)
            .find(|properties| properties.title == title)
            .map(|properties| SheetHandle {
                sheet_id: properties.sheet_id,
                title: properties.title,
            }))
    }

    async fn add_sheet(&self, title: &str) -> Result<SheetHandle, ReportError> {
        let reply = self
            .batch_update(json!([{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {
                            "rowCount": DEFAULT_SHEET_ROWS,
                            "columnCount": DEFAULT_SHEET_COLUMNS,
                        }
                    }
                }
            }]))
            .await?;

        let sheet_id = reply["replies"][0]["addSheet"]["properties"]["sheetId"]
            .as_i64()
            .ok_or_else(|| {
                ReportError::Rejected(format!("addSheet reply for '{title}' has no sheetId"))
            })?;

        let blank_header = vec![vec![Cell::Blank; DEFAULT_SHEET_COLUMNS - 1]; HEADER_ROWS];
        let header_range = format!(
            "{}!A1:{}{}",
            quote_sheet_title(title),
            column_letter(DEFAULT_SHEET_COLUMNS - 2),
            HEADER_ROWS
        );
        self.update_values(&header_range, &blank_header).await?;

        tracing::info!(sheet = %title, sheet_id, "created report sheet");
        Ok(SheetHandle {
            sheet_id,
            title: title.to_owned(),
        })
    }
}

impl ReportSurface for SheetsSurface {
    fn name(&self) -> &'static str {
        "sheets"
    }

    fn ensure_sheet<'a>(&'a self, title: &'a str) -> SurfaceFuture<'a, SheetHandle> {
        Box::pin(async move {
            match self.find_sheet(title).await? {
                Some(sheet) => Ok(sheet),
                None => self.add_sheet(title).await,
            }
        })
    }

    fn insert_rows<'a>(
        &'a self,
        sheet: &'a SheetHandle,
        at_row: usize,
        rows: Vec<Vec<Cell>>,
    ) -> SurfaceFuture<'a, ()> {
        Box::pin(async move {
            if rows.is_empty() {
                return Ok(());
            }

            self.batch_update(json!([{
                "insertDimension": {
                    "range": {
                        "sheetId": sheet.sheet_id,
                        "dimension": "ROWS",
                        "startIndex": at_row,
                        "endIndex": at_row + rows.len(),
                    },
                    "inheritFromBefore": false,
                }
            }]))
            .await?;

            let range = format!("{}!A{}", quote_sheet_title(&sheet.title), at_row + 1);
            self.update_values(&range, &rows).await
        })
    }

    fn format_range<'a>(
        &'a self,
        sheet: &'a SheetHandle,
        range: CellRange,
        format: NumberFormat,
    ) -> SurfaceFuture<'a, ()> {
        Box::pin(async move {
            self.batch_update(json!([{
                "repeatCell": {
                    "range": {
                        "sheetId": sheet.sheet_id,
                        "startRowIndex": range.start_row,
                        "endRowIndex": range.end_row,
                        "startColumnIndex": range.start_column,
                        "endColumnIndex": range.end_column,
                    },
                    "cell": {
                        "userEnteredFormat": {
                            "numberFormat": { "type": "NUMBER", "pattern": format.pattern() }
                        }
                    },
                    "fields": "userEnteredFormat.numberFormat",
                }
            }]))
            .await?;
            Ok(())
        })
    }

    fn read_rows<'a>(&'a self, title: &'a str) -> SurfaceFuture<'a, Vec<Vec<Cell>>> {
        Box::pin(async move {
            let url = format!(
                "{}?valueRenderOption=UNFORMATTED_VALUE",
                self.values_url(&quote_sheet_title(title))
            );
            let body = self.send(HttpRequest::get(url)).await?;
            let range: ValueRange = serde_json::from_str(&body)?;

            let rows = range
                .values
                .iter()
                .map(|row| row.iter().map(Cell::from_json).collect())
                .collect();
            Ok(normalize_rows(rows))
        })
    }
}

/// `'2024-01-Binance-NetInflow'`; embedded quotes are doubled.
pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

use crate::domain::model::{spreadsheet_url, CreatedSpreadsheet};
use crate::domain::ports::{SpreadsheetProvider, TokenProvider};
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Clone, Copy)]
enum SheetStep {
    Create,
    Read,
    Append,
}

impl SheetStep {
    fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Append => "append",
        }
    }

    fn error(self, status: Option<u16>, message: String) -> ExportError {
        match self {
            Self::Create => ExportError::SheetCreate { status, message },
            Self::Read => ExportError::SheetRead { status, message },
            Self::Append => ExportError::SheetAppend { status, message },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    spreadsheet_id: String,
    #[serde(default)]
    spreadsheet_url: Option<String>,
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
    #[serde(default)]
    sheet_id: i64,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Bold white text on blue for row 1 of the given tab.
fn header_format_request(sheet_id: i64) -> Value {
    json!({
        "requests": [{
            "repeatCell": {
                "range": { "sheetId": sheet_id, "startRowIndex": 0, "endRowIndex": 1 },
                "cell": {
                    "userEnteredFormat": {
                        "backgroundColor": { "red": 0.2, "green": 0.5, "blue": 0.9 },
                        "textFormat": {
                            "bold": true,
                            "foregroundColor": { "red": 1, "green": 1, "blue": 1 }
                        }
                    }
                },
                "fields": "userEnteredFormat(backgroundColor,textFormat)"
            }
        }]
    })
}

/// Sheets v4 REST client. Tokens come from `T` on every call.
#[derive(Debug)]
pub struct GoogleSheetsClient<T: TokenProvider> {
    client: Client,
    base_url: String,
    tokens: T,
}

impl<T: TokenProvider> GoogleSheetsClient<T> {
    pub fn new(client: Client, base_url: impl Into<String>, tokens: T) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            tokens,
        }
    }

    /// `{base}/v4/spreadsheets/{segments..}`, each segment percent-encoded
    /// on its own so tab names with spaces or `!` survive.
    fn endpoint(&self, step: SheetStep, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| step.error(None, format!("invalid Sheets base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| step.error(None, "Sheets base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, step: SheetStep, request: RequestBuilder) -> Result<String> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| step.error(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| step.error(Some(status.as_u16()), e.to_string()))?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ExportError::auth(format!(
                "Sheets {} rejected the Google token: {}",
                step.name(),
                text.trim()
            )));
        }
        if !status.is_success() {
            return Err(step.error(Some(status.as_u16()), format!("{} {}", status, text.trim())));
        }
        Ok(text)
    }

    async fn append_rows(
        &self,
        step: SheetStep,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<()> {
        let range = format!("{}:append", range);
        let mut url = self.endpoint(step, &[spreadsheet_id, "values", range.as_str()])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        self.send(step, self.client.post(url).json(&json!({ "values": rows })))
            .await?;
        Ok(())
    }

    /// Cosmetic only: a failure is logged and the sync carries on.
    async fn format_header_row(&self, spreadsheet_id: &str, sheet_id: i64) {
        let step = SheetStep::Create;
        let batch_update = format!("{}:batchUpdate", spreadsheet_id);
        let result = match self.endpoint(step, &[batch_update.as_str()]) {
            Ok(url) => {
                self.send(step, self.client.post(url).json(&header_format_request(sheet_id)))
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!("⚠️ Could not format header row of {}: {}", spreadsheet_id, e);
        }
    }
}

#[async_trait]
impl<T: TokenProvider> SpreadsheetProvider for GoogleSheetsClient<T> {
    async fn create_spreadsheet(
        &self,
        title: &str,
        sheet_name: &str,
        headers: &[String],
    ) -> Result<CreatedSpreadsheet> {
        let step = SheetStep::Create;
        let body = json!({
            "properties": { "title": title },
            "sheets": [{
                "properties": {
                    "title": sheet_name,
                    "gridProperties": { "frozenRowCount": 1 }
                }
            }]
        });
        let url = self.endpoint(step, &[])?;
        let text = self.send(step, self.client.post(url).json(&body)).await?;
        let created: CreateResponse = serde_json::from_str(&text)
            .map_err(|e| step.error(None, format!("unexpected create response: {}", e)))?;

        let header_row: Vec<Value> = headers.iter().map(|h| Value::String(h.clone())).collect();
        self.append_rows(
            step,
            &created.spreadsheet_id,
            &format!("{}!A1", sheet_name),
            &[header_row],
        )
        .await?;

        // sheetId 0 is the first tab when the response omits it
        let sheet_id = created
            .sheets
            .first()
            .map(|sheet| sheet.properties.sheet_id)
            .unwrap_or_default();
        self.format_header_row(&created.spreadsheet_id, sheet_id).await;

        Ok(CreatedSpreadsheet {
            spreadsheet_url: created
                .spreadsheet_url
                .unwrap_or_else(|| spreadsheet_url(&created.spreadsheet_id)),
            spreadsheet_id: created.spreadsheet_id,
        })
    }

    async fn read_values(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Vec<Vec<Value>>> {
        let step = SheetStep::Read;
        let url = self.endpoint(step, &[spreadsheet_id, "values", sheet_name])?;
        let text = self.send(step, self.client.get(url)).await?;
        let values: ValuesResponse = serde_json::from_str(&text)
            .map_err(|e| step.error(None, format!("unexpected values response: {}", e)))?;
        Ok(values.values)
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        rows: &[Vec<Value>],
    ) -> Result<()> {
        self.append_rows(SheetStep::Append, spreadsheet_id, sheet_name, rows)
            .await
    }
}

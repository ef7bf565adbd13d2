//! Thin reqwest wrapper over the Sheets v4 REST API.
//!
//! Only the four calls the capability trait needs: spreadsheet metadata
//! (worksheet resolution), a values read, an `appendDimension` batchUpdate,
//! and a RAW-mode values write.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{SpreadsheetClient, Worksheet};
use crate::config::SheetsConfig;
use crate::error::SheetsError;
use crate::utils::truncate;

pub struct RestSheetsClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl RestSheetsClient {
    pub fn new(config: &SheetsConfig, token: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        let base = Url::parse(config.base_url.trim_end_matches('/'))
            .context("Invalid sheets.base_url")?;

        Ok(Self { http, base, token })
    }

    /// Base URL with extra path segments, percent-encoded per segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
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
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// A1-notation worksheet title: single-quoted, embedded quotes doubled.
fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// FORMATTED_VALUE reads come back as strings, but the API is typed as
/// arbitrary JSON; render anything else through its JSON form.
fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

async fn check_status(resp: Response, context: &str) -> Result<Response, SheetsError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SheetsError::Api {
        status: status.as_u16(),
        context: context.to_string(),
        body: truncate(&body, 300),
    })
}

// ── Capability impl ───────────────────────────────────────────────────────────

#[async_trait]
impl SpreadsheetClient for RestSheetsClient {
    async fn worksheet(&self, spreadsheet_id: &str, title: &str) -> Result<Worksheet, SheetsError> {
        let mut url = self.endpoint(&[spreadsheet_id]);
        url.query_pairs_mut().append_pair("fields", "sheets.properties");

        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        let meta: SpreadsheetMeta = check_status(resp, "spreadsheet metadata")
            .await?
            .json()
            .await?;

        meta.sheets
            .into_iter()
            .map(|s| s.properties)
            .find(|p| p.title == title)
            .map(|p| Worksheet {
                spreadsheet_id: spreadsheet_id.to_string(),
                sheet_id: p.sheet_id,
                title: p.title,
                row_count: p.grid_properties.row_count,
            })
            .ok_or_else(|| SheetsError::WorksheetNotFound {
                spreadsheet_id: spreadsheet_id.to_string(),
                title: title.to_string(),
            })
    }

    async fn read_rows(&self, ws: &Worksheet) -> Result<Vec<Vec<String>>, SheetsError> {
        let range = quote_title(&ws.title);
        let url = self.endpoint(&[&ws.spreadsheet_id, "values", &range]);

        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        let body: ValueRange = check_status(resp, "values read").await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn add_rows(&self, ws: &Worksheet, count: u32) -> Result<(), SheetsError> {
        let url = format!("{}/{}:batchUpdate", self.base, ws.spreadsheet_id);
        let body = serde_json::json!({
            "requests": [{
                "appendDimension": {
                    "sheetId": ws.sheet_id,
                    "dimension": "ROWS",
                    "length": count,
                }
            }]
        });

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        check_status(resp, "appendDimension").await?;

        debug!("Grew {}/{} by {} rows", ws.spreadsheet_id, ws.title, count);
        Ok(())
    }

    async fn write_row(
        &self,
        ws: &Worksheet,
        row_index: u32,
        values: &[String],
    ) -> Result<(), SheetsError> {
        let range = format!("{}!A{}", quote_title(&ws.title), row_index);
        let mut url = self.endpoint(&[&ws.spreadsheet_id, "values", &range]);
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });

        let resp = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        check_status(resp, "row write").await?;

        debug!("Wrote row {} to {}/{}", row_index, ws.spreadsheet_id, ws.title);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Spreadsheet reader for the team roster.
//!
//! The roster is collected via a form and lands in a Google Sheet; this crate
//! reads one worksheet through the Sheets `values` REST endpoint and turns it
//! into [`RawRow`]s using the configured header-to-field mapping. A failed
//! read is fatal to the run: there is nothing useful to sync without the sheet.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use rostersync_shared::{RawRow, Result, RosterSyncError};

/// Default Sheets API origin.
const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Default timeout in seconds for the values request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for sheet requests.
const USER_AGENT: &str = concat!("RosterSync/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options & client
// ---------------------------------------------------------------------------

/// Configuration for the sheet reader.
#[derive(Debug, Clone)]
pub struct SheetsOptions {
    /// API origin. Overridable for tests against a local mock server.
    pub base_url: String,
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for SheetsOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Thin typed client over the Sheets `values` endpoint.
pub struct SheetsClient {
    client: Client,
    base_url: Url,
}

impl SheetsClient {
    /// Create a new client with the given options.
    pub fn new(opts: &SheetsOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| RosterSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&opts.base_url)
            .map_err(|e| RosterSyncError::config(format!("invalid sheets base URL: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Fetch one worksheet as headers + data rows.
    ///
    /// The first row of the value range is taken as the header row.
    #[instrument(skip_all, fields(sheet_id = %sheet_id, worksheet = %worksheet))]
    pub async fn fetch(
        &self,
        sheet_id: &str,
        worksheet: &str,
        api_key: &str,
    ) -> Result<Worksheet> {
        let url = self.values_url(sheet_id, worksheet, api_key)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RosterSyncError::sheet(format!("values request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RosterSyncError::sheet(format!(
                "values endpoint returned HTTP {status}"
            )));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| RosterSyncError::sheet(format!("invalid values response: {e}")))?;

        let mut values = range.values.into_iter();
        let headers: Vec<String> = values
            .next()
            .ok_or_else(|| RosterSyncError::sheet("worksheet has no header row"))?
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        let rows: Vec<Vec<String>> = values.collect();

        info!(columns = headers.len(), rows = rows.len(), "worksheet downloaded");

        Ok(Worksheet { headers, rows })
    }

    /// Build the values URL with encoded path segments and the API key.
    fn values_url(&self, sheet_id: &str, worksheet: &str, api_key: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RosterSyncError::config("sheets base URL cannot be a base"))?
            .extend(["v4", "spreadsheets", sheet_id, "values", worksheet]);
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }
}

/// Wire shape of the Sheets values response.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Worksheet
// ---------------------------------------------------------------------------

/// A downloaded worksheet: header row plus data rows, both untyped strings.
#[derive(Debug, Clone)]
pub struct Worksheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Worksheet {
    /// Apply the header → canonical field mapping and produce one [`RawRow`]
    /// per data row. Headers without a mapping entry pass through unchanged;
    /// rows shorter than the header row are padded with empty values.
    pub fn into_rows(self, columns: &HashMap<String, String>) -> Vec<RawRow> {
        let fields: Vec<&str> = self
            .headers
            .iter()
            .map(|h| columns.get(h).map(String::as_str).unwrap_or(h.as_str()))
            .collect();

        self.rows
            .into_iter()
            .map(|row| {
                let mut raw = RawRow::new();
                for (i, field) in fields.iter().enumerate() {
                    let value = row.get(i).map(String::as_str).unwrap_or("");
                    raw.insert(*field, value);
                }
                debug!(?raw, "mapped row");
                raw
            })
            .collect()
    }
}

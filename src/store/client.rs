//! Store Client - ClickHouse HTTP transport
//!
//! Read statements are POSTed as the request body with `FORMAT JSONEachRow`
//! appended, scalar parameters bound through the store's `param_*` mechanism.
//! Inserts put the statement in the `query` URL parameter and stream the row
//! payload as the body, so values never touch statement text.

use crate::error::{IngestError, Result};
use crate::query::Query;
use crate::record::Record;
use crate::store::profile::ConnectionProfile;
use futures::StreamExt;
use reqwest::StatusCode;
use std::pin::Pin;
use tracing::debug;

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static>>;

pub struct StoreClient {
    http: reqwest::Client,
    profile: ConnectionProfile,
}

impl StoreClient {
    pub fn new(profile: ConnectionProfile) -> Self {
        Self {
            http: reqwest::Client::new(),
            profile,
        }
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    fn request(&self, query: &Query) -> reqwest::RequestBuilder {
        let mut params: Vec<(String, String)> =
            vec![("database".to_string(), self.profile.database.clone())];
        for (name, value) in &query.params {
            params.push((format!("param_{}", name), value.clone()));
        }
        self.http
            .post(self.profile.base_url())
            .query(&params)
            .header("X-ClickHouse-User", &self.profile.user)
            .header("X-ClickHouse-Key", &self.profile.token)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(IngestError::Connection(format!(
                "store rejected the credential ({}): {}",
                status, body
            )))
        } else {
            Err(IngestError::Query(format!(
                "store returned {}: {}",
                status, body
            )))
        }
    }

    /// Execute a statement that returns no rows (DDL).
    pub async fn execute(&self, query: &Query) -> Result<()> {
        debug!(sql = %query.sql, "executing statement");
        let response = self
            .request(query)
            .body(query.sql.clone())
            .send()
            .await
            .map_err(IngestError::from_transport)?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Run a read statement and collect every row. Used for small metadata
    /// and preview results; full transfers go through [`stream_rows`].
    ///
    /// [`stream_rows`]: StoreClient::stream_rows
    pub async fn fetch_rows(&self, query: &Query) -> Result<Vec<serde_json::Value>> {
        let mut cursor = self.stream_rows(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = cursor.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Run a read statement and return a forward-only cursor over its rows.
    /// Memory use is bounded by the transport buffer plus one row, not by
    /// result size.
    pub async fn stream_rows(&self, query: &Query) -> Result<JsonRowCursor> {
        let sql = format!("{} FORMAT JSONEachRow", query.sql);
        debug!(sql = %sql, "streaming query");
        let response = self
            .request(query)
            .body(sql)
            .send()
            .await
            .map_err(IngestError::from_transport)?;
        let response = Self::check_status(response).await?;
        Ok(JsonRowCursor::new(Box::pin(response.bytes_stream())))
    }

    /// Load one batch of records through an insert head built by the query
    /// builder. Rows travel as a JSONEachRow body.
    pub async fn insert_rows(&self, insert_head: &str, rows: &[Record]) -> Result<()> {
        let mut body = String::new();
        for row in rows {
            body.push_str(&row.to_json_row().to_string());
            body.push('\n');
        }
        let response = self
            .http
            .post(self.profile.base_url())
            .query(&[
                ("database", self.profile.database.as_str()),
                ("query", insert_head),
            ])
            .header("X-ClickHouse-User", &self.profile.user)
            .header("X-ClickHouse-Key", &self.profile.token)
            .body(body)
            .send()
            .await
            .map_err(IngestError::from_transport)?;
        Self::check_status(response).await?;
        Ok(())
    }
}

/// Incremental line-splitting cursor over a JSONEachRow response body.
pub struct JsonRowCursor {
    body: ByteStream,
    buffer: Vec<u8>,
    exhausted: bool,
}

impl JsonRowCursor {
    fn new(body: ByteStream) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            exhausted: false,
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let newline = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    pub async fn next_row(&mut self) -> Result<Option<serde_json::Value>> {
        loop {
            if let Some(line) = self.take_line() {
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(serde_json::from_slice(&line)?));
            }
            if self.exhausted {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                // Trailing row without a final newline.
                let line = std::mem::take(&mut self.buffer);
                return Ok(Some(serde_json::from_slice(&line)?));
            }
            match self.body.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(IngestError::from_transport)?;
                    self.buffer.extend_from_slice(&chunk);
                }
                None => self.exhausted = true,
            }
        }
    }
}

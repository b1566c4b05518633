use async_trait::async_trait;
use chrono::Local;
use log::{debug, info};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::client::ClientConfig;
use super::deserializers::{lenient_string, single_or_vec_or_null};
use super::http_client::{create_client, ensure_success};
use super::normalize::McpSearchItem;
use super::types::{BidRecord, SearchRequest};
use super::{BidSource, SourceType};
use crate::config::Settings;
use crate::error::{BidwatchError, Result};

const EVENT_DATA_PREFIX: &str = "data: ";

/// KKJ search tool reached through an MCP server over streamable HTTP
pub struct McpClient {
    server_url: String,
    tool_name: String,
    max_results: u32,
    http_client: Client,
}

impl McpClient {
    pub fn new(
        server_url: impl Into<String>,
        tool_name: impl Into<String>,
        max_results: u32,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self {
            server_url: server_url.into(),
            tool_name: tool_name.into(),
            max_results,
            http_client: create_client(&config)?,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.mcp.server_url.clone(),
            settings.mcp.tool_name.clone(),
            settings.search.max_results_per_query,
            ClientConfig::with_timeout(settings.mcp.timeout_secs),
        )
    }

    /// JSON-RPC `tools/call` body for one search
    pub fn build_payload(&self, request: &SearchRequest) -> Result<Value> {
        let count = request.count.unwrap_or(self.max_results);
        let cft_issue_date = request.date_range(Local::now().date_naive())?;

        Ok(json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "id": 1,
            "params": {
                "name": self.tool_name,
                "arguments": {
                    "query": request.keyword,
                    "count": count,
                    "cftIssueDate": cft_issue_date,
                },
            },
        }))
    }
}

#[async_trait]
impl BidSource for McpClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<BidRecord>> {
        info!("MCP search: keyword={}", request.keyword);

        let payload = self.build_payload(request)?;
        debug!("MCP request: {}", payload);

        let response = self
            .http_client
            .post(&self.server_url)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&payload)
            .send()
            .await?;
        let response = ensure_success(response)?;
        let body = response.text().await?;

        let envelope = parse_event_stream(&body)?;
        let (hits, records) = extract_records(envelope, &self.tool_name)?;

        info!(
            "MCP search: {} hits, {} records (keyword={})",
            hits.as_deref().unwrap_or("?"),
            records.len(),
            request.keyword
        );
        Ok(records)
    }

    fn source_type(&self) -> SourceType {
        SourceType::Mcp
    }

    fn base_url(&self) -> &str {
        &self.server_url
    }
}

/// Pull the JSON payload out of an event-stream body.
///
/// The first `data: ` line carries the JSON-RPC response; a body without one
/// is a parse error.
pub fn parse_event_stream(body: &str) -> Result<Value> {
    let data = body
        .lines()
        .find_map(|line| line.strip_prefix(EVENT_DATA_PREFIX))
        .ok_or_else(|| BidwatchError::Parse("event-stream response has no data line".to_string()))?;

    serde_json::from_str(data)
        .map_err(|e| BidwatchError::Parse(format!("Invalid JSON in event-stream data: {}", e)))
}

// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    result: Option<ToolResult>,
}

#[derive(Debug, Deserialize)]
struct ToolResult {
    #[serde(default)]
    content: Vec<ToolContent>,
    #[serde(rename = "isError", default)]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct ToolContent {
    #[serde(default)]
    text: Option<String>,
}

// The tool's own result, serialized as JSON text inside the first content block
#[derive(Debug, Deserialize)]
struct KkjSearchPayload {
    #[serde(rename = "SearchHits", default, deserialize_with = "lenient_string")]
    search_hits: Option<String>,
    #[serde(
        rename = "SearchResult",
        default,
        deserialize_with = "single_or_vec_or_null"
    )]
    search_result: Option<Vec<McpSearchItem>>,
    #[serde(rename = "isError", default)]
    is_error: bool,
}

/// Check a decoded JSON-RPC response for errors and normalize its results.
///
/// Returns the reported hit count (if any) and the records that carry an id.
pub fn extract_records(
    envelope: Value,
    tool_name: &str,
) -> Result<(Option<String>, Vec<BidRecord>)> {
    let response: RpcResponse = serde_json::from_value(envelope)
        .map_err(|e| BidwatchError::Parse(format!("Unexpected MCP response shape: {}", e)))?;

    if let Some(error) = response.error {
        return Err(BidwatchError::protocol("mcp", error.to_string()));
    }

    let result = response.result.ok_or_else(|| {
        BidwatchError::Parse("MCP response has neither result nor error".to_string())
    })?;

    let text = result
        .content
        .into_iter()
        .next()
        .and_then(|c| c.text)
        .ok_or_else(|| BidwatchError::Parse("MCP result has no text content".to_string()))?;

    if result.is_error {
        return Err(BidwatchError::protocol(tool_name, text));
    }

    let payload: KkjSearchPayload = serde_json::from_str(&text).map_err(|e| {
        BidwatchError::Parse(format!(
            "Failed to parse {} result: {}. Text starts with: {}",
            tool_name,
            e,
            text.chars().take(100).collect::<String>()
        ))
    })?;

    if payload.is_error {
        return Err(BidwatchError::protocol(tool_name, text));
    }

    let records = payload
        .search_result
        .unwrap_or_default()
        .into_iter()
        .filter_map(McpSearchItem::into_record)
        .collect();

    Ok((payload.search_hits, records))
}

use anyhow::{Context, Result};
use log::warn;
use std::collections::BTreeMap;
use std::path::Path;

use super::types::Exchange;

/// Parse an HTTP Archive (HAR) document into exchanges.
///
/// Malformed entries are skipped with a warning rather than failing the
/// whole import.
pub fn parse_har_file(path: &Path) -> Result<Vec<Exchange>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read HAR file: {}", path.display()))?;
    parse_har(&content)
}

pub fn parse_har(content: &str) -> Result<Vec<Exchange>> {
    let har: serde_json::Value =
        serde_json::from_str(content).context("Failed to parse HAR JSON")?;

    let entries = har
        .pointer("/log/entries")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut exchanges = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        match parse_entry(entry) {
            Some(exchange) => exchanges.push(exchange),
            None => warn!("Skipping malformed HAR entry #{}", index),
        }
    }
    Ok(exchanges)
}

fn parse_entry(entry: &serde_json::Value) -> Option<Exchange> {
    let request = entry.get("request")?;
    let response = entry.get("response")?;

    let url = request.get("url").and_then(|v| v.as_str())?.to_string();
    let path = reqwest::Url::parse(&url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.clone());

    let mut query_params = BTreeMap::new();
    if let Some(items) = request.get("queryString").and_then(|v| v.as_array()) {
        for item in items {
            if let (Some(name), Some(value)) = (
                item.get("name").and_then(|v| v.as_str()),
                item.get("value").and_then(|v| v.as_str()),
            ) {
                query_params.insert(name.to_string(), value.to_string());
            }
        }
    }

    let request_headers = parse_headers(request.get("headers"));
    let response_headers = parse_headers(response.get("headers"));

    let (request_body, request_content_type) = match request.get("postData") {
        Some(post) => parse_body(
            post.get("text").and_then(|v| v.as_str()),
            post.get("mimeType").and_then(|v| v.as_str()),
        ),
        None => (None, None),
    };

    let (response_body, response_content_type) = match response.get("content") {
        Some(content) => parse_body(
            content.get("text").and_then(|v| v.as_str()),
            content.get("mimeType").and_then(|v| v.as_str()),
        ),
        None => (None, None),
    };

    Some(Exchange {
        method: request
            .get("method")
            .and_then(|v| v.as_str())
            .unwrap_or("GET")
            .to_string(),
        url,
        path,
        query_params,
        request_headers,
        request_body,
        request_content_type,
        status_code: response.get("status").and_then(|v| v.as_u64()).unwrap_or(0) as u16,
        response_headers,
        response_body,
        response_content_type,
        duration_ms: entry.get("time").and_then(|v| v.as_f64()),
        timestamp: chrono::Utc::now(),
    })
}

fn parse_headers(value: Option<&serde_json::Value>) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    if let Some(items) = value.and_then(|v| v.as_array()) {
        for item in items {
            if let (Some(name), Some(val)) = (
                item.get("name").and_then(|v| v.as_str()),
                item.get("value").and_then(|v| v.as_str()),
            ) {
                headers.insert(name.to_string(), val.to_string());
            }
        }
    }
    headers
}

/// JSON bodies are parsed opportunistically; anything else stays raw text.
fn parse_body(
    text: Option<&str>,
    mime_type: Option<&str>,
) -> (Option<serde_json::Value>, Option<String>) {
    let content_type = mime_type.map(|m| m.to_string());
    let body = text.map(|t| {
        if mime_type.map_or(false, |m| m.contains("json")) {
            serde_json::from_str(t).unwrap_or_else(|_| serde_json::Value::String(t.to_string()))
        } else {
            serde_json::Value::String(t.to_string())
        }
    });
    (body, content_type)
}

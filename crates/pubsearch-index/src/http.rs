//! HTTP implementation of [`SearchBackend`].
//!
//! Speaks the engine's JSON REST surface with blocking requests; every call
//! is bounded by the configured timeout. Search calls are synchronous
//! request/response, indexing calls run inside batch tasks, so a blocking
//! client keeps the pipeline simple and independently schedulable.

use std::time::Duration;

use reqwest::{StatusCode, blocking::Client};
use serde_json::Value;

use crate::backend::{BackendError, BulkItemError, BulkOp, BulkReport, SearchBackend};

/// Error types the engine reports for malformed query syntax.
const SYNTAX_ERROR_TYPES: &[&str] = &[
    "parsing_exception",
    "query_shard_exception",
    "search_phase_execution_exception",
];

/// A blocking HTTP client for one search backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    /// The underlying HTTP client, carrying the request timeout.
    client: Client,
    /// Base URL of the backend, without a trailing slash.
    base_url: String,
}

impl HttpBackend {
    /// Creates a client for the given base URL with a request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds a full request URL from path segments.
    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Sends a JSON request and decodes the JSON response.
    ///
    /// Non-success responses are classified: recognised query-syntax error
    /// types become [`BackendError::QuerySyntax`] carrying the engine's own
    /// reason; everything else is [`BackendError::Rejected`].
    fn send_json(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<Value, BackendError> {
        let response = request
            .send()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }
        Err(classify_error(status, &body))
    }
}

/// Maps an error response to the backend error taxonomy.
fn classify_error(status: StatusCode, body: &Value) -> BackendError {
    let error = &body["error"];
    let error_type = error["type"].as_str().unwrap_or_default();
    let reason = error["root_cause"][0]["reason"]
        .as_str()
        .or_else(|| error["reason"].as_str())
        .unwrap_or("unknown error")
        .to_string();

    if SYNTAX_ERROR_TYPES.contains(&error_type)
        || SYNTAX_ERROR_TYPES.contains(&error["root_cause"][0]["type"].as_str().unwrap_or_default())
    {
        BackendError::QuerySyntax(reason)
    } else {
        BackendError::Rejected(format!("{status}: {reason}"))
    }
}

impl SearchBackend for HttpBackend {
    fn search(&self, index: &str, body: &Value) -> Result<Value, BackendError> {
        self.send_json(self.client.post(self.url(&format!("{index}/_search"))).json(body))
    }

    fn bulk_index(&self, index: &str, ops: &[BulkOp]) -> Result<BulkReport, BackendError> {
        if ops.is_empty() {
            return Ok(BulkReport::default());
        }

        let mut payload = String::new();
        for op in ops {
            let mut action = serde_json::json!({
                "index": {"_index": index, "_id": op.id}
            });
            if let Some(routing) = op.routing {
                action["index"]["routing"] = Value::String(routing.to_string());
            }
            payload.push_str(&action.to_string());
            payload.push('\n');
            payload.push_str(&op.document.to_string());
            payload.push('\n');
        }

        let body = self.send_json(
            self.client
                .post(self.url("_bulk"))
                .header("content-type", "application/x-ndjson")
                .body(payload),
        )?;

        Ok(parse_bulk_response(&body))
    }

    fn get(&self, index: &str, id: u64) -> Result<Option<Value>, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("{index}/_doc/{id}")))
            .send()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }
        Ok(Some(body["_source"].clone()))
    }

    fn delete_by_ids(&self, index: &str, ids: &[u64]) -> Result<(), BackendError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut payload = String::new();
        for id in ids {
            payload.push_str(
                &serde_json::json!({"delete": {"_index": index, "_id": id}}).to_string(),
            );
            payload.push('\n');
        }
        self.send_json(
            self.client
                .post(self.url("_bulk"))
                .header("content-type", "application/x-ndjson")
                .body(payload),
        )?;
        Ok(())
    }

    fn update(
        &self,
        index: &str,
        id: u64,
        routing: Option<u64>,
        patch: &Value,
        retry_on_conflict: u32,
    ) -> Result<(), BackendError> {
        let mut url = format!(
            "{}?retry_on_conflict={retry_on_conflict}",
            self.url(&format!("{index}/_update/{id}"))
        );
        if let Some(routing) = routing {
            url.push_str(&format!("&routing={routing}"));
        }
        self.send_json(self.client.post(url).json(&serde_json::json!({"doc": patch})))?;
        Ok(())
    }

    fn create_index(&self, index: &str, schema: &Value) -> Result<(), BackendError> {
        self.send_json(self.client.put(self.url(index)).json(schema))?;
        Ok(())
    }

    fn delete_index(&self, index: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.url(index))
            .send()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Err(classify_error(status, &body))
    }

    fn update_mapping(&self, index: &str, mappings: &Value) -> Result<(), BackendError> {
        self.send_json(
            self.client
                .put(self.url(&format!("{index}/_mapping")))
                .json(mappings),
        )?;
        Ok(())
    }
}

/// Collects per-item errors from a bulk response body.
fn parse_bulk_response(body: &Value) -> BulkReport {
    let mut report = BulkReport::default();
    let Some(items) = body["items"].as_array() else {
        return report;
    };
    for item in items {
        let entry = &item["index"];
        let id = entry["_id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        match entry["error"].as_object() {
            Some(error) => report.errors.push(BulkItemError {
                id,
                reason: error
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown reason")
                    .to_string(),
            }),
            None => report.indexed += 1,
        }
    }
    report
}

//! JSON-RPC 2.0 client for the local data-aggregation service.
//!
//! Each tool is one `POST` of
//! `{"jsonrpc":"2.0","id":N,"method":"tools/call","params":{"name":..,"arguments":{}}}`
//! carrying the session token in the `Mcp-Session-Id` header.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::DataServiceConfig;
use crate::error::ToolError;

/// Header carrying the data-service session token.
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Something that can run a named tool and return its raw response body.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Call one tool. `Ok` carries the raw body, which may or may not be JSON.
    async fn call_tool(&self, name: &str) -> Result<String, ToolError>;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: ToolCallParams<'a>,
}

#[derive(Debug, Serialize)]
struct ToolCallParams<'a> {
    name: &'a str,
    arguments: serde_json::Value,
}

/// reqwest-backed `ToolSource` speaking JSON-RPC over HTTP.
pub struct JsonRpcToolClient {
    config: DataServiceConfig,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcToolClient {
    pub fn new(config: DataServiceConfig) -> Result<Self, ToolError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ToolError::RequestFailed {
            name: "client".into(),
            reason: format!("Failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            config,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl ToolSource for JsonRpcToolClient {
    async fn call_tool(&self, name: &str) -> Result<String, ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method: "tools/call",
            params: ToolCallParams {
                name,
                arguments: serde_json::json!({}),
            },
        };

        debug!(tool = %name, id, endpoint = %self.config.endpoint, "Calling data tool");

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(SESSION_HEADER, self.config.session_id.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ToolError::RequestFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(tool = %name, status = %status, "Data service returned non-success status");
        }

        response
            .text()
            .await
            .map_err(|e| ToolError::ResponseUnreadable {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

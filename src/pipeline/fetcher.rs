//! Data fetcher — calls the category's tools in order and collects responses.
//!
//! A failing tool never fails the fetch: its slot holds an error payload and
//! the remaining tools still run.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::pipeline::jsonrpc::ToolSource;
use crate::pipeline::types::{Category, CategoryResult, FetchedFinancialData};

/// Resolves a category to its tool list and runs each tool once.
pub struct DataFetcher {
    source: Arc<dyn ToolSource>,
}

impl DataFetcher {
    pub fn new(source: Arc<dyn ToolSource>) -> Self {
        Self { source }
    }

    /// Fetch data for `category`. Unmapped categories call nothing.
    pub async fn fetch(&self, category: Category, metadata: &CategoryResult) -> FetchedFinancialData {
        let mut data = FetchedFinancialData::default();

        let Some(tools) = category.tools() else {
            warn!(category = %category, "No tool mapping for category; nothing fetched");
            return data;
        };

        if tools.is_empty() {
            info!(category = %category, "No tools mapped for category");
            return data;
        }

        for tool in tools {
            let name = tool.name();
            let response = match self.source.call_tool(name).await {
                Ok(raw) => parse_tool_body(name, raw),
                Err(e) => {
                    warn!(tool = %name, error = %e, "Tool call failed");
                    json!({"error": "Request failed", "content": e.to_string()})
                }
            };
            data.push(name, response);
        }

        let failed = data.responses.iter().filter(|r| r.is_error_payload()).count();
        info!(
            category = %category,
            customer = %metadata.name,
            tools = data.len(),
            failed,
            "Financial data fetched"
        );

        data
    }
}

/// Parse a tool body as JSON, wrapping anything else as an error payload.
fn parse_tool_body(tool: &str, raw: String) -> serde_json::Value {
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(_) => {
            warn!(tool = %tool, "Tool returned non-JSON response");
            json!({"error": "Invalid JSON response", "content": raw})
        }
    }
}

//! Public mutual fund catalog (MFAPI) used by the SIP advisor.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ToolError;

const CATALOG_NAME: &str = "mfapi";
const CATALOG_TIMEOUT: Duration = Duration::from_secs(10);

/// One scheme from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FundScheme {
    #[serde(rename = "schemeCode", default)]
    pub scheme_code: Option<u64>,
    #[serde(rename = "schemeName")]
    pub scheme_name: String,
}

/// Source of SIP-suitable fund schemes.
#[async_trait]
pub trait FundCatalog: Send + Sync {
    /// Up to `count` equity schemes, in catalog order.
    async fn equity_funds(&self, count: usize) -> Result<Vec<FundScheme>, ToolError>;
}

/// MFAPI (`GET /mf`) client.
pub struct MfApiCatalog {
    client: reqwest::Client,
    url: String,
}

impl MfApiCatalog {
    pub fn new(url: impl Into<String>) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(CATALOG_TIMEOUT)
            .build()
            .map_err(|e| request_failed(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FundCatalog for MfApiCatalog {
    async fn equity_funds(&self, count: usize) -> Result<Vec<FundScheme>, ToolError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(request_failed(format!("HTTP {status}")));
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| ToolError::ResponseUnreadable {
                    name: CATALOG_NAME.into(),
                    reason: e.to_string(),
                })?;

        let funds = select_equity_funds(&body, count).ok_or_else(|| {
            ToolError::ResponseUnreadable {
                name: CATALOG_NAME.into(),
                reason: "expected a JSON array of schemes".into(),
            }
        })?;
        debug!(count = funds.len(), "Equity funds loaded from catalog");
        Ok(funds)
    }
}

fn request_failed(reason: String) -> ToolError {
    ToolError::RequestFailed {
        name: CATALOG_NAME.into(),
        reason,
    }
}

/// Keep schemes whose name mentions "Equity", first `count` only.
/// Entries that are not scheme objects are skipped. `None` if `body` is not
/// an array.
pub fn select_equity_funds(body: &serde_json::Value, count: usize) -> Option<Vec<FundScheme>> {
    let entries = body.as_array()?;
    let funds: Vec<FundScheme> = entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<FundScheme>(entry.clone()) {
            Ok(scheme) => Some(scheme),
            Err(e) => {
                warn!(error = %e, "Skipping malformed catalog entry");
                None
            }
        })
        .filter(|scheme| scheme.scheme_name.contains("Equity"))
        .take(count)
        .collect();
    Some(funds)
}

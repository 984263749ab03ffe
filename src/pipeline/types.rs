//! Shared types for the advisory pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::tools::Tool;

// ── Inbound message ─────────────────────────────────────────────────

/// One fetched email. Read-only once created.
///
/// Serialized as-is into the handoff file; `email` keeps the field name the
/// handoff format has always used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub subject: String,
    pub body: String,
    #[serde(rename = "email")]
    pub sender_email: String,
    /// Message-ID header, used to thread the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

impl InboundMessage {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        sender_email: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            sender_email: sender_email.into(),
            message_id: None,
            received_at: None,
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}

// ── Category ────────────────────────────────────────────────────────

/// Closed set of labels an inbound email can be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "FI_QA")]
    FiQa,
    #[serde(rename = "Finance")]
    Finance,
    #[serde(rename = "Goal_Planning")]
    GoalPlanning,
    #[serde(rename = "SIP_Advisor")]
    SipAdvisor,
    #[serde(rename = "Trade_Executor")]
    TradeExecutor,
    /// Unparsable, unrecognized or suspected phishing. Ends the run.
    #[serde(rename = "Non-standard")]
    NonStandard,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::FiQa,
        Self::Finance,
        Self::GoalPlanning,
        Self::SipAdvisor,
        Self::TradeExecutor,
        Self::NonStandard,
    ];

    /// Canonical identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiQa => "FI_QA",
            Self::Finance => "Finance",
            Self::GoalPlanning => "Goal_Planning",
            Self::SipAdvisor => "SIP_Advisor",
            Self::TradeExecutor => "Trade_Executor",
            Self::NonStandard => "Non-standard",
        }
    }

    /// Human description shown to the categorizing model.
    pub fn description(&self) -> &'static str {
        match self {
            Self::FiQa => "FI Money app enquiry or factual finance question",
            Self::Finance => "Financial advice on overall finances",
            Self::GoalPlanning => "Goal planning (saving towards a purchase, trip, education)",
            Self::SipAdvisor => "SIP / mutual fund advice",
            Self::TradeExecutor => "Stock trading advice",
            Self::NonStandard => "Non-standard, unrelated or phishing email",
        }
    }

    /// Lenient label match: canonical identifiers and the human aliases
    /// models tend to echo back. Anything unrecognized is `NonStandard`.
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "fi_qa" | "fiqa" | "fi_money_app_enquiry" | "fi_money_app_inquiry" => Self::FiQa,
            "finance" | "financial_advice" => Self::Finance,
            "goal_planning" | "goal_plan" | "goal_planner" => Self::GoalPlanning,
            "sip_advisor" | "sip_advice" | "sip" => Self::SipAdvisor,
            "trade_executor" | "stock_trading_advice" | "trader" | "trading" => {
                Self::TradeExecutor
            }
            _ => Self::NonStandard,
        }
    }

    /// Data-service tools to call for this category, in call order.
    /// `NonStandard` is not mapped and returns `None`.
    pub fn tools(&self) -> Option<&'static [Tool]> {
        match self {
            Self::Finance => Some(&[
                Tool::FetchNetWorth,
                Tool::FetchCreditReport,
                Tool::FetchBankTransactions,
            ]),
            Self::FiQa => Some(&[]),
            Self::GoalPlanning => Some(&[
                Tool::FetchBankTransactions,
                Tool::FetchMfTransactions,
                Tool::FetchStockTransactions,
            ]),
            Self::SipAdvisor => Some(&[Tool::FetchNetWorth, Tool::FetchMfTransactions]),
            Self::TradeExecutor => Some(&[Tool::FetchNetWorth, Tool::FetchStockTransactions]),
            Self::NonStandard => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorizer output: the label plus contact details pulled from the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category: Category,
    pub name: String,
    pub phone: String,
}

impl CategoryResult {
    /// The universal fallback for any categorization failure.
    pub fn non_standard() -> Self {
        Self {
            category: Category::NonStandard,
            name: String::new(),
            phone: String::new(),
        }
    }
}

// ── Fetched data ────────────────────────────────────────────────────

/// One tool's raw response (or error payload).
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub tool: String,
    pub response: serde_json::Value,
}

impl ToolResponse {
    /// Whether this entry is an error payload rather than service data.
    pub fn is_error_payload(&self) -> bool {
        self.response
            .as_object()
            .is_some_and(|o| o.contains_key("error") && o.contains_key("content"))
    }
}

/// Tool results for one category, in call order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedFinancialData {
    pub responses: Vec<ToolResponse>,
}

impl FetchedFinancialData {
    pub fn push(&mut self, tool: impl Into<String>, response: serde_json::Value) {
        self.responses.push(ToolResponse {
            tool: tool.into(),
            response,
        });
    }

    pub fn get(&self, tool: &str) -> Option<&serde_json::Value> {
        self.responses
            .iter()
            .find(|r| r.tool == tool)
            .map(|r| &r.response)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.responses.iter().map(|r| r.tool.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Ordered list of single-key objects: `[{"fetch_net_worth": {...}}, ...]`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.responses
                .iter()
                .map(|r| {
                    let mut entry = serde_json::Map::new();
                    entry.insert(r.tool.clone(), r.response.clone());
                    serde_json::Value::Object(entry)
                })
                .collect(),
        )
    }
}

// ── Orchestrator states ─────────────────────────────────────────────

/// The six orchestration stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchEmail,
    Categorize,
    Decide,
    FetchData,
    Dispatch,
    SendReply,
}

impl Stage {
    /// Progress label, e.g. `"3/6"`.
    pub fn step(&self) -> &'static str {
        match self {
            Self::FetchEmail => "1/6",
            Self::Categorize => "2/6",
            Self::Decide => "3/6",
            Self::FetchData => "4/6",
            Self::Dispatch => "5/6",
            Self::SendReply => "6/6",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FetchEmail => "fetch_email",
            Self::Categorize => "categorize",
            Self::Decide => "decide",
            Self::FetchData => "fetch_data",
            Self::Dispatch => "dispatch",
            Self::SendReply => "send_reply",
        }
    }
}

/// How an orchestration run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The mailbox had nothing unread.
    NoUnreadMail,
    /// Categorized as `Non-standard`; nothing fetched, dispatched or sent.
    Skipped { category: Category },
    /// No advisor registered for the category.
    NoAdvisor { category: Category },
    /// The advisor produced no text.
    SkippedNoOutput { category: Category, advisor: String },
    /// The advisor call failed; no reply is sent.
    AdvisorFailed {
        category: Category,
        advisor: String,
        reason: String,
    },
    /// Reply sent.
    Replied {
        category: Category,
        advisor: String,
        to: String,
        message_id: String,
    },
}

impl RunOutcome {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoUnreadMail => "no_unread_mail",
            Self::Skipped { .. } => "skipped",
            Self::NoAdvisor { .. } => "no_advisor",
            Self::SkippedNoOutput { .. } => "skipped_no_output",
            Self::AdvisorFailed { .. } => "advisor_failed",
            Self::Replied { .. } => "replied",
        }
    }

    pub fn replied(&self) -> bool {
        matches!(self, Self::Replied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serde_uses_canonical_identifiers() {
        for category in Category::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, category.as_str());
            let back: Category = serde_json::from_value(json).unwrap();
            assert_eq!(back, category);
        }
    }

    #[test]
    fn from_label_accepts_identifiers_and_aliases() {
        assert_eq!(Category::from_label("SIP_Advisor"), Category::SipAdvisor);
        assert_eq!(Category::from_label("SIP Advice"), Category::SipAdvisor);
        assert_eq!(Category::from_label("goal planning"), Category::GoalPlanning);
        assert_eq!(Category::from_label("FI Money app enquiry"), Category::FiQa);
        assert_eq!(Category::from_label("  finance "), Category::Finance);
        assert_eq!(
            Category::from_label("Stock trading advice"),
            Category::TradeExecutor
        );
    }

    #[test]
    fn from_label_coerces_unknown_to_non_standard() {
        assert_eq!(Category::from_label(""), Category::NonStandard);
        assert_eq!(Category::from_label("Crypto tips"), Category::NonStandard);
        assert_eq!(
            Category::from_label("Non-standard (phish email)"),
            Category::NonStandard
        );
    }

    #[test]
    fn tool_mapping_matches_category_table() {
        let names = |c: Category| -> Vec<&'static str> {
            c.tools().unwrap().iter().map(|t| t.name()).collect()
        };
        assert_eq!(
            names(Category::Finance),
            ["fetch_net_worth", "fetch_credit_report", "fetch_bank_transactions"]
        );
        assert!(names(Category::FiQa).is_empty());
        assert_eq!(
            names(Category::GoalPlanning),
            [
                "fetch_bank_transactions",
                "fetch_mf_transactions",
                "fetch_stock_transactions"
            ]
        );
        assert_eq!(
            names(Category::SipAdvisor),
            ["fetch_net_worth", "fetch_mf_transactions"]
        );
        assert_eq!(
            names(Category::TradeExecutor),
            ["fetch_net_worth", "fetch_stock_transactions"]
        );
        assert!(Category::NonStandard.tools().is_none());
    }

    #[test]
    fn fetched_data_keeps_order_in_json() {
        let mut data = FetchedFinancialData::default();
        data.push("fetch_net_worth", serde_json::json!({"total": 10}));
        data.push("fetch_mf_transactions", serde_json::json!([]));

        let json = data.to_json();
        assert_eq!(json[0]["fetch_net_worth"]["total"], 10);
        assert!(json[1]["fetch_mf_transactions"].is_array());
        assert_eq!(data.tool_names(), ["fetch_net_worth", "fetch_mf_transactions"]);
    }

    #[test]
    fn error_payload_detection() {
        let ok = ToolResponse {
            tool: "fetch_net_worth".into(),
            response: serde_json::json!({"result": {}}),
        };
        let bad = ToolResponse {
            tool: "fetch_credit_report".into(),
            response: serde_json::json!({"error": "Invalid JSON response", "content": "oops"}),
        };
        assert!(!ok.is_error_payload());
        assert!(bad.is_error_payload());
    }

    #[test]
    fn inbound_message_uses_email_field_name() {
        let msg = InboundMessage::new("Hi", "Body", "a@example.com");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["email"], "a@example.com");
        assert!(json.get("message_id").is_none());
    }

    #[test]
    fn stages_are_numbered_in_order() {
        let steps: Vec<_> = [
            Stage::FetchEmail,
            Stage::Categorize,
            Stage::Decide,
            Stage::FetchData,
            Stage::Dispatch,
            Stage::SendReply,
        ]
        .iter()
        .map(|s| s.step())
        .collect();
        assert_eq!(steps, ["1/6", "2/6", "3/6", "4/6", "5/6", "6/6"]);
    }
}

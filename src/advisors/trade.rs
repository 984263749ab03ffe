//! Trade executor: advisory trade ideas from net worth and stock holdings.
//!
//! Advisory only. Nothing here places orders.

use std::sync::Arc;

use async_trait::async_trait;

use crate::advisors::prompt::{complete_once, customer_profile, email_section, tool_section};
use crate::advisors::{Advisor, AdvisorInput, AdvisorKind, AdvisorOutcome};
use crate::llm::provider::LlmProvider;
use crate::pipeline::tools::Tool;

const SYSTEM_PROMPT: &str =
    "You are a careful equity trading advisor. You suggest trades; you never execute them.";

pub struct TradeAdvisor {
    llm: Arc<dyn LlmProvider>,
}

impl TradeAdvisor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Advisor for TradeAdvisor {
    fn kind(&self) -> AdvisorKind {
        AdvisorKind::TradeExecutor
    }

    async fn advise(&self, input: &AdvisorInput<'_>) -> AdvisorOutcome {
        complete_once(self.llm.as_ref(), SYSTEM_PROMPT, build_prompt(input)).await
    }
}

fn build_prompt(input: &AdvisorInput<'_>) -> String {
    format!(
        "Review the customer's net worth and current stock holdings and answer their trading \
         question.\n\n\
         Rules:\n\
         - Base every suggestion on the holdings below; do not invent positions.\n\
         - For each idea give the action (buy, sell, hold), the rationale and the main risk.\n\
         - Keep position sizes proportionate to net worth and flag concentration risk.\n\
         - State clearly that these are suggestions and no order has been placed.\n\n\
         Customer:\n{profile}\n\n\
         {email}\n\n\
         Net Worth:\n{net_worth}\n\n\
         Stock Transactions:\n{stocks}",
        profile = customer_profile(input),
        email = email_section(input),
        net_worth = tool_section(input.data, Tool::FetchNetWorth.name()),
        stocks = tool_section(input.data, Tool::FetchStockTransactions.name()),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::pipeline::types::{Category, CategoryResult, FetchedFinancialData, InboundMessage};

    #[tokio::test]
    async fn prompt_uses_holdings_and_blank_reply_is_empty_advice() {
        let llm = Arc::new(ScriptedLlm::replying("   \n"));
        let advisor = TradeAdvisor::new(llm.clone());

        let message = InboundMessage::new("Should I sell INFY?", "", "t@example.com");
        let customer = CategoryResult {
            category: Category::TradeExecutor,
            name: "T".into(),
            phone: String::new(),
        };
        let mut data = FetchedFinancialData::default();
        data.push("fetch_net_worth", json!({"netWorth": 500000}));
        data.push(
            "fetch_stock_transactions",
            json!([{"symbol": "INFY", "qty": 40}]),
        );

        let outcome = advisor
            .advise(&AdvisorInput {
                message: &message,
                customer: &customer,
                data: &data,
            })
            .await;

        assert_eq!(outcome, AdvisorOutcome::Advice(String::new()));
        let prompt = llm.last_prompt();
        assert!(prompt.contains("\"symbol\": \"INFY\""));
        assert!(prompt.contains("no order has been placed"));
        assert!(prompt.contains("Email Body:\n(empty)"));
    }
}

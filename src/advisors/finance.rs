//! Finance insight advisor: ratios and actionable points from net worth,
//! credit report and bank transactions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::advisors::prompt::{complete_once, customer_profile, data_section, email_section};
use crate::advisors::{Advisor, AdvisorInput, AdvisorKind, AdvisorOutcome};
use crate::llm::provider::LlmProvider;

const SYSTEM_PROMPT: &str = "You are a helpful and realistic financial advisor.";

pub struct FinanceAdvisor {
    llm: Arc<dyn LlmProvider>,
}

impl FinanceAdvisor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Advisor for FinanceAdvisor {
    fn kind(&self) -> AdvisorKind {
        AdvisorKind::FinanceInsight
    }

    async fn advise(&self, input: &AdvisorInput<'_>) -> AdvisorOutcome {
        complete_once(self.llm.as_ref(), SYSTEM_PROMPT, build_prompt(input)).await
    }
}

fn build_prompt(input: &AdvisorInput<'_>) -> String {
    format!(
        "You are a financial advisor AI agent. Given the following person's financial details, \
         give realistic and personalized financial insights.\n\
         Avoid generic statements. Use financial logic and common planning advice. Mention key \
         ratios like savings rate, debt-to-income and investment mix.\n\n\
         Person Info:\n{profile}\n\n\
         {email}\n\n\
         Financial Data (net worth, credit report, bank transactions):\n{data}\n\n\
         Give clear bullet points with insights.",
        profile = customer_profile(input),
        email = email_section(input),
        data = data_section(input.data),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::pipeline::types::{Category, CategoryResult, FetchedFinancialData, InboundMessage};

    fn fixture() -> (InboundMessage, CategoryResult, FetchedFinancialData) {
        let mut data = FetchedFinancialData::default();
        data.push("fetch_net_worth", json!({"netWorth": 1250000}));
        data.push("fetch_credit_report", json!({"score": 780}));
        (
            InboundMessage::new("Review my finances", "Am I saving enough?", "ravi@example.com"),
            CategoryResult {
                category: Category::Finance,
                name: "Ravi Verma".into(),
                phone: "9876543210".into(),
            },
            data,
        )
    }

    #[tokio::test]
    async fn prompt_embeds_profile_and_data() {
        let llm = Arc::new(ScriptedLlm::replying("  - Savings rate is 36%\n"));
        let advisor = FinanceAdvisor::new(llm.clone());
        let (message, customer, data) = fixture();

        let outcome = advisor
            .advise(&AdvisorInput {
                message: &message,
                customer: &customer,
                data: &data,
            })
            .await;

        assert_eq!(outcome, AdvisorOutcome::Advice("- Savings rate is 36%".into()));
        assert_eq!(llm.calls(), 1);
        let prompt = llm.last_prompt();
        assert!(prompt.contains("Name: Ravi Verma"));
        assert!(prompt.contains("\"netWorth\": 1250000"));
        assert!(prompt.contains("Am I saving enough?"));
        assert!(prompt.contains("debt-to-income"));
    }

    #[tokio::test]
    async fn model_failure_is_a_failed_outcome() {
        let advisor = FinanceAdvisor::new(Arc::new(ScriptedLlm::failing("HTTP 500")));
        let (message, customer, data) = fixture();

        let outcome = advisor
            .advise(&AdvisorInput {
                message: &message,
                customer: &customer,
                data: &data,
            })
            .await;

        match outcome {
            AdvisorOutcome::Failed { reason } => assert!(reason.contains("HTTP 500")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}

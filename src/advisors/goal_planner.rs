//! Goal planner: a step-by-step plan towards the goal stated in the email.

use std::sync::Arc;

use async_trait::async_trait;

use crate::advisors::prompt::{complete_once, customer_profile, tool_section};
use crate::advisors::{Advisor, AdvisorInput, AdvisorKind, AdvisorOutcome};
use crate::llm::provider::LlmProvider;
use crate::pipeline::tools::Tool;

const SYSTEM_PROMPT: &str = "You are a factual, realistic financial planning assistant.";

pub struct GoalPlannerAdvisor {
    llm: Arc<dyn LlmProvider>,
}

impl GoalPlannerAdvisor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Advisor for GoalPlannerAdvisor {
    fn kind(&self) -> AdvisorKind {
        AdvisorKind::GoalPlanner
    }

    async fn advise(&self, input: &AdvisorInput<'_>) -> AdvisorOutcome {
        complete_once(self.llm.as_ref(), SYSTEM_PROMPT, build_prompt(input)).await
    }
}

/// The goal is whatever the customer wrote; subject and body together.
fn goal_statement(input: &AdvisorInput<'_>) -> String {
    let subject = input.message.subject.trim();
    let body = input.message.body.trim();
    match (subject.is_empty(), body.is_empty()) {
        (true, true) => "No specific goal mentioned.".to_string(),
        (false, true) => subject.to_string(),
        (true, false) => body.to_string(),
        (false, false) => format!("{subject}\n{body}"),
    }
}

fn build_prompt(input: &AdvisorInput<'_>) -> String {
    let data = input.data;
    format!(
        "You are a financial goal planner AI assistant. Based on the user's financial situation \
         and their goal, generate a realistic financial plan.\n\n\
         Rules:\n\
         - Avoid hallucinations or generic advice.\n\
         - Use real financial logic.\n\
         - Suggest practical steps based on the user's income, expenses, and timeline.\n\
         - Include savings targets, investment strategy, risk mitigation and key milestones.\n\n\
         User Financial Info:\n{profile}\n\n\
         Bank Transactions:\n{bank}\n\n\
         Mutual Fund Transactions:\n{mf}\n\n\
         Stock Transactions:\n{stocks}\n\n\
         Goal Statement:\n\"{goal}\"\n\n\
         Now suggest a realistic, step-by-step financial plan to help the user achieve the goal \
         efficiently.",
        profile = customer_profile(input),
        bank = tool_section(data, Tool::FetchBankTransactions.name()),
        mf = tool_section(data, Tool::FetchMfTransactions.name()),
        stocks = tool_section(data, Tool::FetchStockTransactions.name()),
        goal = goal_statement(input),
    )
}

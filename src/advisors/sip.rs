//! SIP advisor: five SIP options chosen against the public equity fund list.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::advisors::fund_catalog::{FundCatalog, FundScheme};
use crate::advisors::prompt::{complete_once, customer_profile, email_section, tool_section};
use crate::advisors::{Advisor, AdvisorInput, AdvisorKind, AdvisorOutcome};
use crate::llm::provider::LlmProvider;
use crate::pipeline::tools::Tool;

const SYSTEM_PROMPT: &str = "You are a smart, data-driven SIP mutual fund advisor.";

pub struct SipAdvisor {
    llm: Arc<dyn LlmProvider>,
    catalog: Arc<dyn FundCatalog>,
    fund_count: usize,
}

impl SipAdvisor {
    pub fn new(llm: Arc<dyn LlmProvider>, catalog: Arc<dyn FundCatalog>, fund_count: usize) -> Self {
        Self {
            llm,
            catalog,
            fund_count,
        }
    }
}

#[async_trait]
impl Advisor for SipAdvisor {
    fn kind(&self) -> AdvisorKind {
        AdvisorKind::SipAdvisor
    }

    async fn advise(&self, input: &AdvisorInput<'_>) -> AdvisorOutcome {
        let funds = match self.catalog.equity_funds(self.fund_count).await {
            Ok(funds) if !funds.is_empty() => funds,
            Ok(_) => {
                warn!("Fund catalog returned no equity schemes");
                return AdvisorOutcome::failed("Unable to fetch mutual fund data");
            }
            Err(e) => {
                warn!(error = %e, "Fund catalog unavailable");
                return AdvisorOutcome::failed(format!("Unable to fetch mutual fund data: {e}"));
            }
        };

        complete_once(self.llm.as_ref(), SYSTEM_PROMPT, build_prompt(input, &funds)).await
    }
}

fn build_prompt(input: &AdvisorInput<'_>, funds: &[FundScheme]) -> String {
    let fund_list = funds
        .iter()
        .map(|f| format!("- {}", f.scheme_name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Instructions:\n\
         - Thoroughly analyze the user's profile and investment goal.\n\
         - Carefully study the given mutual funds.\n\
         - Only recommend funds with proven growth or strong potential.\n\
         - If none are suitable, suggest better alternatives from known categories (like ELSS, \
           large-cap, mid-cap, balanced, flexi-cap).\n\
         - Use real financial logic: CAGR, NAV trends, risk category, fund history.\n\
         - Keep responses concise, structured, and useful.\n\n\
         User Profile:\n{profile}\n\n\
         {email}\n\n\
         Net Worth:\n{net_worth}\n\n\
         Existing Mutual Fund Transactions:\n{mf}\n\n\
         Available Mutual Funds:\n{fund_list}\n\n\
         Please suggest the 5 best SIP options with detailed reasoning.",
        profile = customer_profile(input),
        email = email_section(input),
        net_worth = tool_section(input.data, Tool::FetchNetWorth.name()),
        mf = tool_section(input.data, Tool::FetchMfTransactions.name()),
    )
}

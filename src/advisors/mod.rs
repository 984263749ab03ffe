//! Advisor handlers and the category → advisor dispatch table.
//!
//! Each advisor turns the fetched financial data into advice text with a
//! single completion call. Failures are returned as `AdvisorOutcome::Failed`
//! rather than as an error so the orchestrator can tell "the model said this"
//! apart from "the call failed".

pub mod fi_qa;
pub mod finance;
pub mod fund_catalog;
pub mod goal_planner;
pub mod prompt;
pub mod sip;
pub mod trade;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::AdvisorsConfig;
use crate::llm::create_provider;
use crate::pipeline::types::{Category, CategoryResult, FetchedFinancialData, InboundMessage};

pub use fi_qa::FiQaAdvisor;
pub use finance::FinanceAdvisor;
pub use fund_catalog::{FundCatalog, MfApiCatalog};
pub use goal_planner::GoalPlannerAdvisor;
pub use sip::SipAdvisor;
pub use trade::TradeAdvisor;

/// The five advisor handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdvisorKind {
    FinanceInsight,
    GoalPlanner,
    SipAdvisor,
    FiQa,
    TradeExecutor,
}

impl AdvisorKind {
    pub const ALL: [AdvisorKind; 5] = [
        Self::FinanceInsight,
        Self::GoalPlanner,
        Self::SipAdvisor,
        Self::FiQa,
        Self::TradeExecutor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinanceInsight => "finance_insight",
            Self::GoalPlanner => "goal_planner",
            Self::SipAdvisor => "sip_advisor",
            Self::FiQa => "fi_qa",
            Self::TradeExecutor => "trade_executor",
        }
    }

    /// Which advisor handles `category`. `NonStandard` has none.
    pub fn for_category(category: Category) -> Option<Self> {
        match category {
            Category::FiQa => Some(Self::FiQa),
            Category::Finance => Some(Self::FinanceInsight),
            Category::GoalPlanning => Some(Self::GoalPlanner),
            Category::SipAdvisor => Some(Self::SipAdvisor),
            Category::TradeExecutor => Some(Self::TradeExecutor),
            Category::NonStandard => None,
        }
    }
}

impl fmt::Display for AdvisorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an advisor may draw on for one email.
#[derive(Debug, Clone, Copy)]
pub struct AdvisorInput<'a> {
    pub message: &'a InboundMessage,
    pub customer: &'a CategoryResult,
    pub data: &'a FetchedFinancialData,
}

/// Result of one advisor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvisorOutcome {
    /// Model output, trimmed. May be empty.
    Advice(String),
    /// The advisor could not produce advice.
    Failed { reason: String },
}

impl AdvisorOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// A handler that produces advice text from structured input.
#[async_trait]
pub trait Advisor: Send + Sync {
    fn kind(&self) -> AdvisorKind;

    async fn advise(&self, input: &AdvisorInput<'_>) -> AdvisorOutcome;
}

/// Category → advisor lookup.
#[derive(Default)]
pub struct AdvisorTable {
    advisors: BTreeMap<AdvisorKind, Arc<dyn Advisor>>,
}

impl AdvisorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build all five advisors, each with its own model credentials.
    pub fn from_config(config: &AdvisorsConfig) -> crate::error::Result<Self> {
        let catalog: Arc<dyn FundCatalog> =
            Arc::new(MfApiCatalog::new(config.fund_catalog.url.clone())?);

        let mut table = Self::new();
        table.register(Arc::new(FinanceAdvisor::new(create_provider(
            &config.finance,
        )?)));
        table.register(Arc::new(GoalPlannerAdvisor::new(create_provider(
            &config.goal_planner,
        )?)));
        table.register(Arc::new(SipAdvisor::new(
            create_provider(&config.sip_advisor)?,
            catalog,
            config.fund_catalog.fund_count,
        )));
        table.register(Arc::new(FiQaAdvisor::with_knowledge_base_file(
            create_provider(&config.fi_qa)?,
            config.knowledge_base_path.as_deref(),
        )));
        table.register(Arc::new(TradeAdvisor::new(create_provider(
            &config.trade_executor,
        )?)));
        Ok(table)
    }

    /// Register (or replace) the handler for its kind.
    pub fn register(&mut self, advisor: Arc<dyn Advisor>) {
        self.advisors.insert(advisor.kind(), advisor);
    }

    pub fn kinds(&self) -> Vec<AdvisorKind> {
        self.advisors.keys().copied().collect()
    }

    /// Handler for `category`, if one is mapped and registered.
    pub fn resolve(&self, category: Category) -> Option<&Arc<dyn Advisor>> {
        AdvisorKind::for_category(category).and_then(|kind| self.advisors.get(&kind))
    }

    /// Invoke the handler for `category`. `None` when nothing is mapped.
    pub async fn dispatch(
        &self,
        category: Category,
        input: &AdvisorInput<'_>,
    ) -> Option<(AdvisorKind, AdvisorOutcome)> {
        let Some(advisor) = self.resolve(category) else {
            warn!(category = %category, "No advisor registered for category");
            return None;
        };

        let kind = advisor.kind();
        let outcome = advisor.advise(input).await;
        match &outcome {
            AdvisorOutcome::Advice(text) => {
                info!(advisor = %kind, chars = text.len(), "Advisor executed")
            }
            AdvisorOutcome::Failed { reason } => {
                warn!(advisor = %kind, reason = %reason, "Advisor failed")
            }
        }
        Some((kind, outcome))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingAdvisor {
        kind: AdvisorKind,
        calls: AtomicUsize,
    }

    impl CountingAdvisor {
        fn new(kind: AdvisorKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Advisor for CountingAdvisor {
        fn kind(&self) -> AdvisorKind {
            self.kind
        }

        async fn advise(&self, _input: &AdvisorInput<'_>) -> AdvisorOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            AdvisorOutcome::Advice(format!("advice from {}", self.kind))
        }
    }

    fn input_parts() -> (InboundMessage, CategoryResult, FetchedFinancialData) {
        (
            InboundMessage::new("Subject", "Body", "a@example.com"),
            CategoryResult {
                category: Category::SipAdvisor,
                name: "A".into(),
                phone: "123".into(),
            },
            FetchedFinancialData::default(),
        )
    }

    #[test]
    fn every_standard_category_has_an_advisor() {
        for category in Category::ALL {
            let kind = AdvisorKind::for_category(category);
            assert_eq!(kind.is_none(), category == Category::NonStandard, "{category}");
        }
        assert_eq!(
            AdvisorKind::for_category(Category::Finance),
            Some(AdvisorKind::FinanceInsight)
        );
    }

    #[tokio::test]
    async fn dispatch_invokes_only_the_matching_handler() {
        let sip = CountingAdvisor::new(AdvisorKind::SipAdvisor);
        let finance = CountingAdvisor::new(AdvisorKind::FinanceInsight);
        let mut table = AdvisorTable::new();
        table.register(sip.clone());
        table.register(finance.clone());

        let (message, customer, data) = input_parts();
        let input = AdvisorInput {
            message: &message,
            customer: &customer,
            data: &data,
        };
        let (kind, outcome) = table.dispatch(Category::SipAdvisor, &input).await.unwrap();

        assert_eq!(kind, AdvisorKind::SipAdvisor);
        assert_eq!(outcome, AdvisorOutcome::Advice("advice from sip_advisor".into()));
        assert_eq!(sip.calls.load(Ordering::SeqCst), 1);
        assert_eq!(finance.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dispatch_without_mapping_returns_none() {
        let finance = CountingAdvisor::new(AdvisorKind::FinanceInsight);
        let mut table = AdvisorTable::new();
        table.register(finance.clone());

        let (message, customer, data) = input_parts();
        let input = AdvisorInput {
            message: &message,
            customer: &customer,
            data: &data,
        };

        assert!(table.dispatch(Category::NonStandard, &input).await.is_none());
        // Mapped category, but no handler registered for it.
        assert!(table.dispatch(Category::TradeExecutor, &input).await.is_none());
        assert_eq!(finance.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn register_replaces_same_kind() {
        let mut table = AdvisorTable::new();
        table.register(CountingAdvisor::new(AdvisorKind::FiQa));
        table.register(CountingAdvisor::new(AdvisorKind::FiQa));
        assert_eq!(table.kinds(), vec![AdvisorKind::FiQa]);
    }

    #[test]
    fn from_config_registers_all_five_advisors() {
        let env = |key: &str| (key == "LLM_API_KEY").then(|| "shared-key".to_string());
        let config = AdvisorsConfig::from_env(&env).unwrap();

        let table = AdvisorTable::from_config(&config).unwrap();

        assert_eq!(
            table.kinds(),
            [
                AdvisorKind::FinanceInsight,
                AdvisorKind::GoalPlanner,
                AdvisorKind::SipAdvisor,
                AdvisorKind::FiQa,
                AdvisorKind::TradeExecutor,
            ]
        );
    }
}

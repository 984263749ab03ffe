//! Named financial-data tools exposed by the data-aggregation service.

use std::fmt;

/// A remote data query invoked via JSON-RPC `tools/call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    FetchNetWorth,
    FetchCreditReport,
    FetchBankTransactions,
    FetchMfTransactions,
    FetchStockTransactions,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Self::FetchNetWorth,
        Self::FetchCreditReport,
        Self::FetchBankTransactions,
        Self::FetchMfTransactions,
        Self::FetchStockTransactions,
    ];

    /// Wire name sent as `params.name`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchNetWorth => "fetch_net_worth",
            Self::FetchCreditReport => "fetch_credit_report",
            Self::FetchBankTransactions => "fetch_bank_transactions",
            Self::FetchMfTransactions => "fetch_mf_transactions",
            Self::FetchStockTransactions => "fetch_stock_transactions",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

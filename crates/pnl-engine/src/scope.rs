use serde::{Deserialize, Serialize};

/// Slice of the ledger a series is reconstructed for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// Every account and symbol handed in
    All,
    /// One account, all symbols
    Account { account: String },
    /// One (account, symbol) pair
    Symbol { account: String, symbol: String },
}

impl Scope {
    pub fn account(account: impl Into<String>) -> Self {
        Self::Account {
            account: account.into(),
        }
    }

    pub fn symbol(account: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::Symbol {
            account: account.into(),
            symbol: symbol.into(),
        }
    }

    pub fn contains(&self, account: &str, symbol: &str) -> bool {
        match self {
            Self::All => true,
            Self::Account { account: a } => a == account,
            Self::Symbol {
                account: a,
                symbol: s,
            } => a == account && s.eq_ignore_ascii_case(symbol),
        }
    }
}

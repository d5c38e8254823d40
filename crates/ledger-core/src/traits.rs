use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{AccountFilter, ClosedTradeGroup, JournalEntry, LedgerError, PositionSnapshot, TradeEvent};

/// Source of raw ledger lines
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn trade_events(&self, accounts: &AccountFilter) -> Result<Vec<TradeEvent>, LedgerError>;
}

/// Source of today's open-position snapshot
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn position_snapshots(
        &self,
        accounts: &AccountFilter,
    ) -> Result<Vec<PositionSnapshot>, LedgerError>;
}

/// Source of classified trade groups
#[async_trait]
pub trait TradeGroupSource: Send + Sync {
    async fn closed_trade_groups(
        &self,
        accounts: &AccountFilter,
    ) -> Result<Vec<ClosedTradeGroup>, LedgerError>;

    /// Open dates of every group, open or closed
    async fn group_open_dates(&self, accounts: &AccountFilter) -> Result<Vec<NaiveDate>, LedgerError>;
}

/// Source of trade journal entries
#[async_trait]
pub trait JournalSource: Send + Sync {
    async fn journal_entries(&self, accounts: &AccountFilter) -> Result<Vec<JournalEntry>, LedgerError>;
}

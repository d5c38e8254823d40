use chrono::NaiveDate;
use ledger_core::ClosedTradeGroup;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single closed trade called out in the review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeHighlight {
    pub account: String,
    pub symbol: String,
    pub strategy: String,
    pub trade_symbol: String,
    pub close_date: Option<NaiveDate>,
    pub total_pnl: Decimal,
}

impl From<&ClosedTradeGroup> for TradeHighlight {
    fn from(group: &ClosedTradeGroup) -> Self {
        Self {
            account: group.account.clone(),
            symbol: group.symbol.clone(),
            strategy: group.strategy.clone(),
            trade_symbol: group.trade_symbol.clone(),
            close_date: group.close_date,
            total_pnl: group.total_pnl,
        }
    }
}

/// Per-strategy outcome counts for the week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyStats {
    pub strategy: String,
    pub trades: usize,
    pub winning_trades: usize,
    pub win_rate: Decimal,
    pub total_pnl: Decimal,
}

/// New positions opened this week against the week before
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDrift {
    pub this_week_opens: usize,
    pub prev_week_opens: usize,
    pub diff: i64,
}

impl RiskDrift {
    pub fn new(this_week_opens: usize, prev_week_opens: usize) -> Self {
        Self {
            this_week_opens,
            prev_week_opens,
            diff: this_week_opens as i64 - prev_week_opens as i64,
        }
    }
}

/// Journal moods this week against the week before
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalDrift {
    pub this_week: BTreeMap<String, usize>,
    pub prev_week: BTreeMap<String, usize>,
    pub entries_this_week: usize,
    pub entries_prev_week: usize,
}

/// Losing trade whose journal entry carries a risky tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehavioralAnomaly {
    pub symbol: String,
    pub strategy: String,
    pub tags: Vec<String>,
    pub total_pnl: Decimal,
    pub reflection: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReview {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_pnl: Decimal,
    pub num_trades: usize,
    pub num_winners: usize,
    pub best_trade: Option<TradeHighlight>,
    pub worst_trade: Option<TradeHighlight>,
    /// Worst losing trade; none when every trade made money
    pub largest_mistake: Option<TradeHighlight>,
    pub most_consistent_strategy: Option<StrategyStats>,
    pub risk_drift: RiskDrift,
    pub emotional_drift: EmotionalDrift,
    pub behavioral_anomalies: Vec<BehavioralAnomaly>,
}

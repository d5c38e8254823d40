//! Wash Sale Detection
//!
//! Flags closed losses whose (account, symbol) was reopened within the wash
//! sale window around the close date.

use crate::tax_calculator::TaxRules;
use chrono::{Datelike, NaiveDate};
use ledger_core::ClosedTradeGroup;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A loss paired with the repurchase that puts it in a wash sale window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WashSaleFlag {
    pub account: String,
    pub symbol: String,
    pub loss_close_date: NaiveDate,
    pub loss_pnl: Decimal,
    pub loss_strategy: String,
    pub repurchase_open_date: NaiveDate,
    pub repurchase_strategy: String,
    /// Repurchase open date minus loss close date
    pub days_between: i64,
}

/// Detector for potential wash sales across all tax years
pub struct WashSaleDetector {
    window_days: i64,
}

impl WashSaleDetector {
    pub fn new(rules: &TaxRules) -> Self {
        Self {
            window_days: rules.wash_sale_window_days,
        }
    }

    /// At most one flag per loss: the first same-(account, symbol) group, in
    /// input order, that opened inside the window. Groups with an unknown
    /// close or open date never pair.
    pub fn detect(&self, groups: &[ClosedTradeGroup]) -> Vec<WashSaleFlag> {
        let mut flags = Vec::new();

        for (i, loss) in groups.iter().enumerate() {
            if loss.total_pnl >= Decimal::ZERO {
                continue;
            }
            let Some(close_date) = loss.close_date else {
                continue;
            };

            let repurchase = groups
                .iter()
                .enumerate()
                .filter(|(j, other)| {
                    *j != i && other.account == loss.account && other.symbol == loss.symbol
                })
                .find_map(|(_, other)| {
                    let open_date = other.open_date?;
                    let days_between = (open_date - close_date).num_days();
                    (days_between.abs() <= self.window_days).then_some((other, open_date, days_between))
                });

            if let Some((other, open_date, days_between)) = repurchase {
                flags.push(WashSaleFlag {
                    account: loss.account.clone(),
                    symbol: loss.symbol.clone(),
                    loss_close_date: close_date,
                    loss_pnl: loss.total_pnl,
                    loss_strategy: loss.strategy.clone(),
                    repurchase_open_date: open_date,
                    repurchase_strategy: other.strategy.clone(),
                    days_between,
                });
            }
        }

        tracing::debug!(groups = groups.len(), flags = flags.len(), "wash sale scan complete");
        flags
    }
}

/// Flags whose loss closed in `year`
pub fn flags_for_year(flags: &[WashSaleFlag], year: i32) -> Vec<WashSaleFlag> {
    flags
        .iter()
        .filter(|f| f.loss_close_date.year() == year)
        .cloned()
        .collect()
}

/// Summary of wash sale activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WashSaleSummary {
    pub tax_year: i32,
    pub flag_count: usize,
    /// Sum of the flagged losses, as a positive amount
    pub total_flagged_loss: Decimal,
    pub affected_symbols: Vec<String>,
}

impl WashSaleSummary {
    pub fn for_year(flags: &[WashSaleFlag], year: i32) -> Self {
        let year_flags = flags_for_year(flags, year);
        let total_flagged_loss = year_flags.iter().map(|f| f.loss_pnl.abs()).sum();
        let affected_symbols: BTreeSet<String> =
            year_flags.iter().map(|f| f.symbol.clone()).collect();

        Self {
            tax_year: year,
            flag_count: year_flags.len(),
            total_flagged_loss,
            affected_symbols: affected_symbols.into_iter().collect(),
        }
    }
}

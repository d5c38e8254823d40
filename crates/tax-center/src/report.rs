//! Tax Center report
//!
//! Everything the tax page shows for one tax year: the gain/loss summary with
//! estimated tax, the classified closed trades, the year's wash sale flags,
//! dividend totals per holding and the years that have any activity.

use crate::tax_calculator::{GainType, TaxBracket, TaxCalculator, TaxRules};
use crate::wash_sale::{flags_for_year, WashSaleDetector, WashSaleFlag, WashSaleSummary};
use chrono::{Datelike, NaiveDate};
use ledger_core::{ClosedTradeGroup, TradeAction, TradeEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Closed group with its holding-period classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedGroup {
    #[serde(flatten)]
    pub group: ClosedTradeGroup,
    pub gain_type: GainType,
}

/// Dividends received from one holding during the year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendRow {
    pub account: String,
    pub symbol: String,
    pub total: Decimal,
    pub count: usize,
    pub last_date: Option<NaiveDate>,
}

/// Year summary with estimated tax
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub st_gains: Decimal,
    pub st_losses: Decimal,
    pub net_st: Decimal,
    pub lt_gains: Decimal,
    pub lt_losses: Decimal,
    pub net_lt: Decimal,
    pub net_total: Decimal,
    pub total_dividends: Decimal,
    pub wash_sale_total: Decimal,
    pub num_closed_trades: usize,
    pub est_st_tax: Decimal,
    pub est_lt_tax: Decimal,
    pub est_div_tax: Decimal,
    pub est_total_tax: Decimal,
    /// Capped deduction against ordinary income, zero unless the year nets a loss
    pub net_loss_deduction: Decimal,
    pub st_rate: u32,
    pub lt_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxReport {
    pub tax_year: i32,
    pub bracket: TaxBracket,
    pub summary: TaxSummary,
    pub gains_rows: Vec<ClassifiedGroup>,
    pub wash_sales: Vec<WashSaleFlag>,
    pub dividend_rows: Vec<DividendRow>,
    /// Years with closed trades or dividends, newest first
    pub years: Vec<i32>,
}

impl TaxReport {
    /// Build the report for `tax_year`.
    ///
    /// `groups` should span every year so that wash sales straddling a year
    /// boundary are still found; `ledger` may contain any lines, only
    /// dividends are used.
    pub fn build(
        groups: &[ClosedTradeGroup],
        ledger: &[TradeEvent],
        tax_year: i32,
        rules: &TaxRules,
    ) -> Self {
        let calculator = TaxCalculator::new(rules.clone());

        let all_flags = WashSaleDetector::new(rules).detect(groups);
        let wash_sales = flags_for_year(&all_flags, tax_year);
        let wash_summary = WashSaleSummary::for_year(&all_flags, tax_year);

        let mut year_groups: Vec<&ClosedTradeGroup> = groups
            .iter()
            .filter(|g| g.close_date.map(|d| d.year()) == Some(tax_year))
            .collect();
        year_groups.sort_by(|a, b| b.close_date.cmp(&a.close_date));

        let dividends = dividend_events(ledger);
        let year_dividends: Vec<&TradeEvent> = dividends
            .iter()
            .copied()
            .filter(|e| e.date.map(|d| d.year()) == Some(tax_year))
            .collect();

        let buckets = calculator.buckets(year_groups.iter().copied());
        let total_dividends: Decimal = year_dividends.iter().map(|e| e.amount).sum();
        let estimate = calculator.estimate(&buckets, total_dividends);

        let summary = TaxSummary {
            st_gains: buckets.st_gains,
            st_losses: buckets.st_losses,
            net_st: buckets.net_short_term(),
            lt_gains: buckets.lt_gains,
            lt_losses: buckets.lt_losses,
            net_lt: buckets.net_long_term(),
            net_total: buckets.net_total(),
            total_dividends,
            wash_sale_total: wash_summary.total_flagged_loss,
            num_closed_trades: year_groups.len(),
            est_st_tax: estimate.short_term_tax,
            est_lt_tax: estimate.long_term_tax,
            est_div_tax: estimate.dividend_tax,
            est_total_tax: estimate.total_tax,
            net_loss_deduction: calculator.loss_deduction(&buckets),
            st_rate: rules.bracket.rate,
            lt_rate: rules.bracket.lt_rate,
        };

        let gains_rows = year_groups
            .iter()
            .map(|g| ClassifiedGroup {
                group: (*g).clone(),
                gain_type: calculator.classify(g),
            })
            .collect();

        tracing::info!(
            tax_year,
            closed_trades = summary.num_closed_trades,
            wash_sales = wash_sales.len(),
            net_total = %summary.net_total,
            "tax report built"
        );

        Self {
            tax_year,
            bracket: rules.bracket,
            summary,
            gains_rows,
            wash_sales,
            dividend_rows: dividend_rows(&year_dividends),
            years: available_years(groups, &dividends),
        }
    }
}

/// Ledger lines that are dividend payments
pub fn dividend_events(ledger: &[TradeEvent]) -> Vec<&TradeEvent> {
    ledger
        .iter()
        .filter(|e| e.action == TradeAction::Dividend)
        .collect()
}

/// Dividends grouped by (account, symbol), largest total first
pub fn dividend_rows(dividends: &[&TradeEvent]) -> Vec<DividendRow> {
    let mut grouped: BTreeMap<(&str, &str), DividendRow> = BTreeMap::new();

    for event in dividends {
        let row = grouped
            .entry((event.account.as_str(), event.symbol.as_str()))
            .or_insert_with(|| DividendRow {
                account: event.account.clone(),
                symbol: event.symbol.clone(),
                total: Decimal::ZERO,
                count: 0,
                last_date: None,
            });
        row.total += event.amount;
        row.count += 1;
        row.last_date = row.last_date.max(event.date);
    }

    let mut rows: Vec<DividendRow> = grouped.into_values().collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows
}

/// Distinct years of close dates and dividend dates, newest first
pub fn available_years(groups: &[ClosedTradeGroup], dividends: &[&TradeEvent]) -> Vec<i32> {
    let years: BTreeSet<i32> = groups
        .iter()
        .filter_map(|g| g.close_date)
        .chain(dividends.iter().filter_map(|e| e.date))
        .map(|d| d.year())
        .collect();
    years.into_iter().rev().collect()
}

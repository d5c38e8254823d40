//! Cumulative P&L reconstruction
//!
//! Splits a scope's ledger into equity, options, dividends and other cash,
//! realizes equity through the average-cost engine, and accumulates the
//! daily contributions into one series. Today's unrealized P&L from the
//! position snapshot is folded into the final point.

use crate::average_cost::{AverageCostEngine, ShortSaleTreatment};
use crate::scope::Scope;
use crate::series::{CumulativeSeries, SeriesPoint};
use chrono::NaiveDate;
use ledger_core::{round_money, InstrumentType, PositionSnapshot, TradeEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Unrealized P&L of a snapshot group, split by source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnrealizedSplit {
    pub equity: Decimal,
    pub options: Decimal,
}

impl UnrealizedSplit {
    pub fn from_snapshots<'a, I>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = &'a PositionSnapshot>,
    {
        let mut split = Self::default();
        for snap in snapshots {
            match snap.instrument_type {
                InstrumentType::Equity => split.equity += snap.unrealized_pnl,
                kind if kind.is_option() => split.options += snap.unrealized_pnl,
                _ => {}
            }
        }
        split
    }

    pub fn total(&self) -> Decimal {
        self.equity + self.options
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DailyContribution {
    equity: Decimal,
    options: Decimal,
    dividends: Decimal,
    other: Decimal,
}

impl DailyContribution {
    fn add(&mut self, other: &DailyContribution) {
        self.equity += other.equity;
        self.options += other.options;
        self.dividends += other.dividends;
        self.other += other.other;
    }

    fn total(&self) -> Decimal {
        self.equity + self.options + self.dividends + self.other
    }
}

/// Builds cumulative P&L series for any scope
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconstructor {
    engine: AverageCostEngine,
}

impl Reconstructor {
    pub fn new(treatment: ShortSaleTreatment) -> Self {
        Self {
            engine: AverageCostEngine::new(treatment),
        }
    }

    /// Reconstruct the cumulative series for `scope` as of `today`.
    pub fn reconstruct(
        &self,
        events: &[TradeEvent],
        snapshots: &[PositionSnapshot],
        scope: &Scope,
        today: NaiveDate,
    ) -> CumulativeSeries {
        let mut days: BTreeMap<NaiveDate, DailyContribution> = BTreeMap::new();
        let mut equity_lines = Vec::new();
        let mut undated = 0usize;

        for event in events.iter().filter(|e| scope.contains(&e.account, &e.symbol)) {
            let Some(date) = event.date else {
                undated += 1;
                continue;
            };

            match event.instrument_type {
                InstrumentType::Equity => {
                    if !event.quantity.is_zero() {
                        days.entry(date).or_default();
                    }
                    equity_lines.push(event);
                }
                kind if kind.is_option() => {
                    days.entry(date).or_default().options += event.amount;
                }
                InstrumentType::Dividend => {
                    days.entry(date).or_default().dividends += event.amount;
                }
                _ => {
                    days.entry(date).or_default().other += event.amount;
                }
            }
        }

        if undated > 0 {
            tracing::debug!(undated, ?scope, "ledger lines without a usable date excluded");
        }

        for (date, pnl) in self.engine.realized_by_date(equity_lines) {
            days.entry(date).or_default().equity += pnl;
        }

        let mut running = DailyContribution::default();
        let points = days
            .into_iter()
            .map(|(date, contribution)| {
                running.add(&contribution);
                SeriesPoint {
                    date,
                    equity_cum: round_money(running.equity),
                    options_cum: round_money(running.options),
                    dividends_cum: round_money(running.dividends),
                    total_cum: round_money(running.total()),
                }
            })
            .collect();

        let mut series = CumulativeSeries { points };
        let unrealized = UnrealizedSplit::from_snapshots(
            snapshots
                .iter()
                .filter(|s| scope.contains(&s.account, &s.symbol)),
        );
        apply_unrealized(&mut series, unrealized, today);
        series
    }

    /// One series per symbol traded in `account`, as the positions view charts
    /// them. Symbols differing only in case share a series.
    pub fn reconstruct_by_symbol(
        &self,
        events: &[TradeEvent],
        snapshots: &[PositionSnapshot],
        account: &str,
        today: NaiveDate,
    ) -> BTreeMap<String, CumulativeSeries> {
        let symbols: BTreeSet<String> = events
            .iter()
            .filter(|e| e.account == account)
            .map(|e| e.symbol.to_uppercase())
            .collect();

        symbols
            .into_iter()
            .map(|symbol| {
                let scope = Scope::symbol(account, symbol.as_str());
                let series = self.reconstruct(events, snapshots, &scope, today);
                (symbol, series)
            })
            .filter(|(_, series)| !series.is_empty())
            .collect()
    }
}

/// Fold today's unrealized P&L into the last point of `series`.
///
/// A last point dated before `today` gets a new point appended after it;
/// otherwise the last point is adjusted in place so dates stay unique.
/// An empty series stays empty.
pub fn apply_unrealized(series: &mut CumulativeSeries, unrealized: UnrealizedSplit, today: NaiveDate) {
    if unrealized.total().is_zero() {
        return;
    }
    let Some(last) = series.points.last_mut() else {
        return;
    };

    if last.date < today {
        let point = SeriesPoint {
            date: today,
            equity_cum: round_money(last.equity_cum + unrealized.equity),
            options_cum: round_money(last.options_cum + unrealized.options),
            dividends_cum: last.dividends_cum,
            total_cum: round_money(last.total_cum + unrealized.total()),
        };
        series.points.push(point);
    } else {
        last.equity_cum = round_money(last.equity_cum + unrealized.equity);
        last.options_cum = round_money(last.options_cum + unrealized.options);
        last.total_cum = round_money(last.total_cum + unrealized.total());
    }
}

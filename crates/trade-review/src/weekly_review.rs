//! Weekly review
//!
//! Summary of the last seven days of closed trades: best and worst trade,
//! the most consistent strategy, how trading volume and journal moods moved
//! against the previous week, and losing trades tagged as impulsive.

use crate::models::{
    BehavioralAnomaly, EmotionalDrift, RiskDrift, StrategyStats, TradeHighlight, WeeklyReview,
};
use chrono::{Duration, NaiveDate};
use ledger_core::{ClosedTradeGroup, JournalEntry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Journal tags that mark a trade as impulsive
pub const RISKY_TAGS: [&str; 3] = ["fomo", "revenge_trade", "boredom_trade"];

/// Minimum closed trades before a strategy's win rate counts
pub const MIN_STRATEGY_TRADES: usize = 2;

pub const MAX_ANOMALIES: usize = 5;
pub const MAX_REFLECTION_CHARS: usize = 200;

/// The review week and the week before it, both inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub prev_start: NaiveDate,
    pub prev_end: NaiveDate,
}

impl WeekBounds {
    /// Seven days ending on `end`, and the seven days before that
    pub fn ending(end: NaiveDate) -> Self {
        let start = end - Duration::days(6);
        let prev_end = start - Duration::days(1);
        Self {
            start,
            end,
            prev_start: prev_end - Duration::days(6),
            prev_end,
        }
    }

    pub fn in_week(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn in_prev_week(&self, date: NaiveDate) -> bool {
        self.prev_start <= date && date <= self.prev_end
    }
}

type JournalKey<'a> = (&'a str, String, &'a str, NaiveDate);

impl WeeklyReview {
    /// Build the review for the week ending on `today`.
    ///
    /// `groups` are closed trade groups (any dates, only those closed this
    /// week are reviewed), `open_dates` the open dates of every trade group,
    /// and `journal` the entries to match against.
    pub fn compute(
        groups: &[ClosedTradeGroup],
        open_dates: &[NaiveDate],
        journal: &[JournalEntry],
        today: NaiveDate,
    ) -> Self {
        let week = WeekBounds::ending(today);

        let risk_drift = RiskDrift::new(
            open_dates.iter().filter(|d| week.in_week(**d)).count(),
            open_dates.iter().filter(|d| week.in_prev_week(**d)).count(),
        );
        let emotional_drift = emotional_drift(journal, &week);

        // newest close first, so ties resolve to the latest trade
        let mut closed: Vec<&ClosedTradeGroup> = groups
            .iter()
            .filter(|g| g.close_date.is_some_and(|d| week.in_week(d)))
            .collect();
        closed.sort_by(|a, b| b.close_date.cmp(&a.close_date));

        let losers: Vec<&ClosedTradeGroup> = closed
            .iter()
            .copied()
            .filter(|g| g.total_pnl < Decimal::ZERO)
            .collect();

        let review = Self {
            week_start: week.start,
            week_end: week.end,
            total_pnl: closed.iter().map(|g| g.total_pnl).sum(),
            num_trades: closed.len(),
            num_winners: closed.iter().filter(|g| g.total_pnl > Decimal::ZERO).count(),
            best_trade: first_by(&closed, |a, b| a > b).map(TradeHighlight::from),
            worst_trade: first_by(&closed, |a, b| a < b).map(TradeHighlight::from),
            largest_mistake: first_by(&losers, |a, b| a < b).map(TradeHighlight::from),
            most_consistent_strategy: most_consistent_strategy(&closed),
            risk_drift,
            emotional_drift,
            behavioral_anomalies: behavioral_anomalies(&losers, journal),
        };

        tracing::info!(
            week_start = %review.week_start,
            week_end = %review.week_end,
            trades = review.num_trades,
            anomalies = review.behavioral_anomalies.len(),
            "weekly review computed"
        );

        review
    }
}

/// First group whose P&L beats every earlier one under `better`
fn first_by<'a>(
    groups: &[&'a ClosedTradeGroup],
    better: impl Fn(Decimal, Decimal) -> bool,
) -> Option<&'a ClosedTradeGroup> {
    groups.iter().copied().fold(None, |best, g| match best {
        Some(b) if !better(g.total_pnl, b.total_pnl) => Some(b),
        _ => Some(g),
    })
}

/// Per-strategy stats for the given trades, keyed by strategy name
pub fn strategy_stats(groups: &[&ClosedTradeGroup]) -> BTreeMap<String, StrategyStats> {
    let mut stats: BTreeMap<String, StrategyStats> = BTreeMap::new();

    for group in groups {
        let entry = stats
            .entry(group.strategy.clone())
            .or_insert_with(|| StrategyStats {
                strategy: group.strategy.clone(),
                trades: 0,
                winning_trades: 0,
                win_rate: Decimal::ZERO,
                total_pnl: Decimal::ZERO,
            });
        entry.trades += 1;
        if group.total_pnl > Decimal::ZERO {
            entry.winning_trades += 1;
        }
        entry.total_pnl += group.total_pnl;
    }

    for entry in stats.values_mut() {
        entry.win_rate = Decimal::from(entry.winning_trades) / Decimal::from(entry.trades);
    }

    stats
}

/// Highest win rate among strategies with enough trades. Ties go to the
/// strategy name that sorts first.
pub fn most_consistent_strategy(groups: &[&ClosedTradeGroup]) -> Option<StrategyStats> {
    strategy_stats(groups)
        .into_values()
        .filter(|s| s.trades >= MIN_STRATEGY_TRADES)
        .fold(None, |best: Option<StrategyStats>, s| match best {
            Some(b) if s.win_rate <= b.win_rate => Some(b),
            _ => Some(s),
        })
}

fn mood_counts<'a>(entries: impl Iterator<Item = &'a JournalEntry>) -> (BTreeMap<String, usize>, usize) {
    let mut counts = BTreeMap::new();
    let mut total = 0;
    for entry in entries {
        total += 1;
        if let Some(mood) = entry.mood.as_deref().filter(|m| !m.is_empty()) {
            *counts.entry(mood.to_string()).or_insert(0) += 1;
        }
    }
    (counts, total)
}

/// Mood counts for entries whose trade opened this week and the week before
pub fn emotional_drift(journal: &[JournalEntry], week: &WeekBounds) -> EmotionalDrift {
    let (this_week, entries_this_week) = mood_counts(
        journal
            .iter()
            .filter(|e| e.trade_open_date.is_some_and(|d| week.in_week(d))),
    );
    let (prev_week, entries_prev_week) = mood_counts(
        journal
            .iter()
            .filter(|e| e.trade_open_date.is_some_and(|d| week.in_prev_week(d))),
    );

    EmotionalDrift {
        this_week,
        prev_week,
        entries_this_week,
        entries_prev_week,
    }
}

/// Losing trades whose journal entry carries a risky tag.
///
/// Entries are matched on (account, symbol ignoring case, strategy, open
/// date); a trade or entry with an unknown open date never matches. When
/// several entries share a key the last one is used.
pub fn behavioral_anomalies(
    losers: &[&ClosedTradeGroup],
    journal: &[JournalEntry],
) -> Vec<BehavioralAnomaly> {
    let by_key: HashMap<JournalKey<'_>, &JournalEntry> = journal
        .iter()
        .filter_map(|e| {
            let opened = e.trade_open_date?;
            Some((
                (e.account.as_str(), e.symbol.to_uppercase(), e.strategy.as_str(), opened),
                e,
            ))
        })
        .collect();

    losers
        .iter()
        .filter_map(|group| {
            let opened = group.open_date?;
            let key = (
                group.account.as_str(),
                group.symbol.to_uppercase(),
                group.strategy.as_str(),
                opened,
            );
            let entry = by_key.get(&key)?;

            let mut tags: Vec<String> = Vec::new();
            for tag in &entry.tags {
                if RISKY_TAGS.contains(&tag.as_str()) && !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
            if tags.is_empty() {
                return None;
            }

            Some(BehavioralAnomaly {
                symbol: group.symbol.clone(),
                strategy: group.strategy.clone(),
                tags,
                total_pnl: group.total_pnl,
                reflection: entry
                    .reflection
                    .as_deref()
                    .unwrap_or_default()
                    .chars()
                    .take(MAX_REFLECTION_CHARS)
                    .collect(),
            })
        })
        .take(MAX_ANOMALIES)
        .collect()
}

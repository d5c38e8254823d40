//! Average-Cost Engine
//!
//! Folds equity ledger lines in date order into per-(account, symbol)
//! inventory and emits realized P&L on every sell.

use chrono::NaiveDate;
use ledger_core::{round_money, InstrumentType, TradeAction, TradeEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a sell with no long inventory behind it is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortSaleTreatment {
    /// The whole sale proceeds are realized P&L. Short positions are not tracked.
    #[default]
    ProceedsAsPnl,
    /// Sells past the long position open signed short inventory; the buy that
    /// covers it realizes `short proceeds - cover cost`.
    TrackShortInventory,
}

impl ShortSaleTreatment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "proceeds" | "proceeds_as_pnl" => Some(Self::ProceedsAsPnl),
            "track" | "track_short_inventory" => Some(Self::TrackShortInventory),
            _ => None,
        }
    }
}

/// Running inventory for one equity symbol.
///
/// `total_cost` is always zero when `shares_held` is zero. With
/// `TrackShortInventory`, a negative `shares_held` is a short position and
/// `total_cost` holds the proceeds still backing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventoryState {
    pub shares_held: Decimal,
    pub total_cost: Decimal,
}

impl InventoryState {
    pub fn new(shares_held: Decimal, total_cost: Decimal) -> Self {
        Self {
            shares_held,
            total_cost,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.shares_held.is_zero()
    }

    /// Cost (or short proceeds) per share, `None` when flat
    pub fn average_cost(&self) -> Option<Decimal> {
        if self.is_flat() {
            None
        } else {
            Some(self.total_cost / self.shares_held.abs())
        }
    }

    fn settle(&mut self) {
        if self.shares_held.is_zero() {
            self.total_cost = Decimal::ZERO;
        }
    }
}

/// Realized P&L attributed to one date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizedPnlEvent {
    pub date: NaiveDate,
    pub pnl: Decimal,
}

/// Inventory keyed by (account, symbol)
pub type InventoryBook = BTreeMap<(String, String), InventoryState>;

/// Generic left fold that collects whatever each step emits.
pub fn fold<S, T, E, I, F>(items: I, initial: S, mut step: F) -> (S, Vec<E>)
where
    I: IntoIterator<Item = T>,
    F: FnMut(&mut S, T) -> Option<E>,
{
    let mut state = initial;
    let mut emitted = Vec::new();
    for item in items {
        if let Some(out) = step(&mut state, item) {
            emitted.push(out);
        }
    }
    (state, emitted)
}

/// Average-cost inventory accounting for equity lines
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageCostEngine {
    treatment: ShortSaleTreatment,
}

impl AverageCostEngine {
    pub fn new(treatment: ShortSaleTreatment) -> Self {
        Self { treatment }
    }

    /// Apply one equity line dated `date` to `state`.
    pub fn step(
        &self,
        state: &mut InventoryState,
        date: NaiveDate,
        event: &TradeEvent,
    ) -> Option<RealizedPnlEvent> {
        let qty = event.quantity.abs();
        if qty.is_zero() {
            return None;
        }

        let pnl = match &event.action {
            TradeAction::Buy => self.apply_buy(state, qty, event.amount.abs())?,
            action if action.is_sell() => self.apply_sell(state, qty, event.amount, event)?,
            _ => return None,
        };

        Some(RealizedPnlEvent {
            date,
            pnl: round_money(pnl),
        })
    }

    fn apply_buy(&self, state: &mut InventoryState, qty: Decimal, cost: Decimal) -> Option<Decimal> {
        if self.treatment == ShortSaleTreatment::TrackShortInventory && state.shares_held < Decimal::ZERO {
            let short = -state.shares_held;
            let covered = qty.min(short);
            let basis = state.average_cost().unwrap_or_default() * covered;
            let cover_cost = cost * covered / qty;

            state.total_cost = (state.total_cost - basis).max(Decimal::ZERO);
            state.shares_held += covered;
            state.settle();

            let rest = qty - covered;
            if rest > Decimal::ZERO {
                state.shares_held += rest;
                state.total_cost += cost - cover_cost;
            }
            return Some(basis - cover_cost);
        }

        state.shares_held += qty;
        state.total_cost += cost;
        None
    }

    fn apply_sell(
        &self,
        state: &mut InventoryState,
        qty: Decimal,
        proceeds: Decimal,
        event: &TradeEvent,
    ) -> Option<Decimal> {
        if state.shares_held > Decimal::ZERO {
            let avg_cost = state.average_cost().unwrap_or_default();
            let sold = qty.min(state.shares_held);
            let cost_basis = avg_cost * sold;

            let pnl = match self.treatment {
                ShortSaleTreatment::TrackShortInventory if qty > sold => {
                    let closing = proceeds * sold / qty;
                    state.shares_held = -(qty - sold);
                    state.total_cost = (proceeds - closing).abs();
                    return Some(closing - cost_basis);
                }
                _ => proceeds - cost_basis,
            };

            state.total_cost = (state.total_cost - cost_basis).max(Decimal::ZERO);
            state.shares_held = (state.shares_held - sold).max(Decimal::ZERO);
            state.settle();
            return Some(pnl);
        }

        match self.treatment {
            ShortSaleTreatment::ProceedsAsPnl => {
                tracing::debug!(
                    account = %event.account,
                    symbol = %event.symbol,
                    %proceeds,
                    "sell without tracked inventory, booking full proceeds"
                );
                Some(proceeds)
            }
            ShortSaleTreatment::TrackShortInventory => {
                state.shares_held -= qty;
                state.total_cost += proceeds.abs();
                None
            }
        }
    }

    /// Fold equity lines in ascending date order. Lines without a date and
    /// non-equity lines are ignored; ties keep their input order. Inventory is
    /// keyed by account and upper-cased symbol.
    pub fn fold<'a, I>(&self, events: I, initial: InventoryBook) -> (InventoryBook, Vec<RealizedPnlEvent>)
    where
        I: IntoIterator<Item = &'a TradeEvent>,
    {
        let mut dated: Vec<(NaiveDate, &TradeEvent)> = events
            .into_iter()
            .filter(|e| e.instrument_type == InstrumentType::Equity)
            .filter_map(|e| e.date.map(|d| (d, e)))
            .collect();
        dated.sort_by_key(|(d, _)| *d);

        fold(dated, initial, |book, (date, event)| {
            let state = book
                .entry((event.account.clone(), event.symbol.to_uppercase()))
                .or_default();
            self.step(state, date, event)
        })
    }

    /// Realized P&L summed per date
    pub fn realized_by_date<'a, I>(&self, events: I) -> BTreeMap<NaiveDate, Decimal>
    where
        I: IntoIterator<Item = &'a TradeEvent>,
    {
        let (_, realized) = self.fold(events, InventoryBook::new());
        let mut by_date = BTreeMap::new();
        for event in realized {
            *by_date.entry(event.date).or_insert(Decimal::ZERO) += event.pnl;
        }
        by_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn equity(action: &str, qty: Decimal, amount: Decimal, d: u32) -> TradeEvent {
        TradeEvent {
            account: "IRA".to_string(),
            symbol: "AAPL".to_string(),
            trade_symbol: "AAPL".to_string(),
            instrument_type: InstrumentType::Equity,
            date: Some(day(d)),
            action: TradeAction::parse(action),
            quantity: qty,
            amount,
        }
    }

    fn key() -> (String, String) {
        ("IRA".to_string(), "AAPL".to_string())
    }

    #[test]
    fn test_all_buys_realize_nothing() {
        let engine = AverageCostEngine::default();
        let events = vec![
            equity("buy", dec!(10), dec!(-100), 2),
            equity("buy", dec!(5), dec!(-60), 3),
        ];

        let (book, realized) = engine.fold(&events, InventoryBook::new());
        assert!(realized.is_empty());
        assert_eq!(book[&key()], InventoryState::new(dec!(15), dec!(160)));
    }

    #[test]
    fn test_full_round_trip() {
        let engine = AverageCostEngine::default();
        let events = vec![
            equity("buy", dec!(10), dec!(-100), 2),
            equity("sell", dec!(10), dec!(150), 5),
        ];

        let (book, realized) = engine.fold(&events, InventoryBook::new());
        assert_eq!(realized, vec![RealizedPnlEvent { date: day(5), pnl: dec!(50) }]);
        assert!(book[&key()].is_flat());
        assert_eq!(book[&key()].total_cost, Decimal::ZERO);
    }

    #[test]
    fn test_partial_sell() {
        let engine = AverageCostEngine::default();
        let events = vec![
            equity("buy", dec!(10), dec!(-100), 2),
            equity("sell", dec!(-4), dec!(60), 5),
        ];

        let (book, realized) = engine.fold(&events, InventoryBook::new());
        assert_eq!(realized[0].pnl, dec!(20));
        assert_eq!(book[&key()], InventoryState::new(dec!(6), dec!(60)));
    }

    #[test]
    fn test_sell_without_inventory_books_proceeds() {
        let engine = AverageCostEngine::default();
        let events = vec![equity("sell", dec!(5), dec!(100), 2)];

        let (book, realized) = engine.fold(&events, InventoryBook::new());
        assert_eq!(realized[0].pnl, dec!(100));
        assert_eq!(book[&key()], InventoryState::default());
    }

    #[test]
    fn test_zero_quantity_is_skipped() {
        let engine = AverageCostEngine::default();
        let events = vec![
            equity("buy", dec!(10), dec!(-100), 2),
            equity("sell", dec!(0), dec!(999), 3),
        ];

        let (book, realized) = engine.fold(&events, InventoryBook::new());
        assert!(realized.is_empty());
        assert_eq!(book[&key()], InventoryState::new(dec!(10), dec!(100)));
    }

    #[test]
    fn test_unsorted_input_is_folded_by_date() {
        let engine = AverageCostEngine::default();
        let events = vec![
            equity("sell", dec!(10), dec!(150), 5),
            equity("buy", dec!(10), dec!(-100), 2),
        ];

        let realized = engine.realized_by_date(&events);
        assert_eq!(realized.get(&day(5)), Some(&dec!(50)));
    }

    #[test]
    fn test_same_day_sells_accumulate() {
        let engine = AverageCostEngine::default();
        let events = vec![
            equity("buy", dec!(10), dec!(-100), 2),
            equity("sell", dec!(4), dec!(60), 5),
            equity("sell", dec!(6), dec!(48), 5),
        ];

        let realized = engine.realized_by_date(&events);
        // 20 on the first lot, 48 - 60 = -12 on the rest
        assert_eq!(realized.get(&day(5)), Some(&dec!(8)));
        assert_eq!(realized.len(), 1);
    }

    #[test]
    fn test_rounding_happens_at_emission() {
        let engine = AverageCostEngine::default();
        let events = vec![
            equity("buy", dec!(3), dec!(-100), 2),
            equity("sell", dec!(1), dec!(40), 3),
            equity("sell", dec!(1), dec!(40), 4),
            equity("sell", dec!(1), dec!(40), 5),
        ];

        let (book, realized) = engine.fold(&events, InventoryBook::new());
        let pnls: Vec<Decimal> = realized.iter().map(|e| e.pnl).collect();
        assert_eq!(pnls, vec![dec!(6.67), dec!(6.67), dec!(6.67)]);
        assert_eq!(book[&key()], InventoryState::default());
    }

    #[test]
    fn test_symbols_keep_separate_inventory() {
        let engine = AverageCostEngine::default();
        let mut msft_buy = equity("buy", dec!(10), dec!(-300), 2);
        msft_buy.symbol = "MSFT".to_string();
        let events = vec![
            msft_buy,
            equity("sell", dec!(5), dec!(100), 3),
        ];

        let (book, realized) = engine.fold(&events, InventoryBook::new());
        // AAPL has no inventory, so the MSFT cost must not leak into it
        assert_eq!(realized[0].pnl, dec!(100));
        assert_eq!(
            book[&("IRA".to_string(), "MSFT".to_string())],
            InventoryState::new(dec!(10), dec!(300))
        );
    }

    #[test]
    fn test_symbol_case_shares_inventory() {
        let engine = AverageCostEngine::default();
        let mut lower_sell = equity("sell", dec!(10), dec!(150), 5);
        lower_sell.symbol = "aapl".to_string();
        let events = vec![equity("buy", dec!(10), dec!(-100), 2), lower_sell];

        let (book, realized) = engine.fold(&events, InventoryBook::new());
        assert_eq!(realized[0].pnl, dec!(50));
        assert_eq!(book.len(), 1);
        assert!(book[&key()].is_flat());
    }

    #[test]
    fn test_average_cost() {
        assert_eq!(InventoryState::new(dec!(4), dec!(50)).average_cost(), Some(dec!(12.5)));
        assert_eq!(InventoryState::new(dec!(-5), dec!(100)).average_cost(), Some(dec!(20)));
        assert_eq!(InventoryState::default().average_cost(), None);
    }

    #[test]
    fn test_tracked_short_is_realized_on_cover() {
        let engine = AverageCostEngine::new(ShortSaleTreatment::TrackShortInventory);
        let events = vec![
            equity("sell_short", dec!(5), dec!(100), 2),
            equity("buy", dec!(5), dec!(-80), 6),
        ];

        let (book, realized) = engine.fold(&events, InventoryBook::new());
        assert_eq!(realized, vec![RealizedPnlEvent { date: day(6), pnl: dec!(20) }]);
        assert_eq!(book[&key()], InventoryState::default());
    }

    #[test]
    fn test_tracked_sell_through_long_opens_short() {
        let engine = AverageCostEngine::new(ShortSaleTreatment::TrackShortInventory);
        let events = vec![
            equity("buy", dec!(10), dec!(-100), 2),
            equity("sell", dec!(15), dec!(225), 3),
            equity("buy", dec!(5), dec!(-50), 4),
        ];

        let (book, realized) = engine.fold(&events, InventoryBook::new());
        // 150 of proceeds close the long at cost 100; 75 backs the short
        assert_eq!(realized[0].pnl, dec!(50));
        // cover 5 at 50 against 75 of short proceeds
        assert_eq!(realized[1].pnl, dec!(25));
        assert_eq!(book[&key()], InventoryState::default());
    }

    #[test]
    fn test_short_sale_treatment_parse() {
        assert_eq!(ShortSaleTreatment::parse("track"), Some(ShortSaleTreatment::TrackShortInventory));
        assert_eq!(ShortSaleTreatment::parse("Proceeds"), Some(ShortSaleTreatment::ProceedsAsPnl));
        assert_eq!(ShortSaleTreatment::parse("fifo"), None);
    }

    #[test]
    fn test_generic_fold() {
        let (sum, evens) = fold(1..=6, 0, |acc, n| {
            *acc += n;
            (n % 2 == 0).then_some(n)
        });
        assert_eq!(sum, 21);
        assert_eq!(evens, vec![2, 4, 6]);
    }
}

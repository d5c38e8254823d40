use crate::db::{db_error, LedgerDb, STATUS_CLOSED};
use async_trait::async_trait;
use chrono::NaiveDate;
use ledger_core::{
    coerce_decimal, parse_date, AccountFilter, ClosedTradeGroup, InstrumentType, JournalEntry,
    JournalSource, LedgerError, PositionSnapshot, PositionSource, RawTradeRow, TradeEvent,
    TradeGroupSource, TransactionSource,
};
use sqlx::{QueryBuilder, Sqlite};

#[derive(Debug, sqlx::FromRow)]
struct TradeEventRow {
    account: Option<String>,
    symbol: Option<String>,
    trade_symbol: Option<String>,
    instrument_type: Option<String>,
    trade_date: Option<String>,
    action: Option<String>,
    quantity: Option<f64>,
    amount: Option<f64>,
}

impl From<TradeEventRow> for TradeEvent {
    fn from(row: TradeEventRow) -> Self {
        RawTradeRow {
            account: row.account,
            symbol: row.symbol,
            trade_symbol: row.trade_symbol,
            instrument_type: row.instrument_type,
            trade_date: row.trade_date,
            action: row.action,
            quantity: row.quantity,
            amount: row.amount,
        }
        .into()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PositionSnapshotRow {
    account: Option<String>,
    symbol: Option<String>,
    trade_symbol: Option<String>,
    instrument_type: Option<String>,
    quantity: Option<f64>,
    unrealized_pnl: Option<f64>,
    market_value: Option<f64>,
}

impl From<PositionSnapshotRow> for PositionSnapshot {
    fn from(row: PositionSnapshotRow) -> Self {
        let symbol = row.symbol.unwrap_or_default().trim().to_uppercase();
        Self {
            account: row.account.unwrap_or_default(),
            trade_symbol: row.trade_symbol.unwrap_or_else(|| symbol.clone()),
            symbol,
            instrument_type: row
                .instrument_type
                .as_deref()
                .map(InstrumentType::parse)
                .unwrap_or(InstrumentType::Other),
            quantity: coerce_decimal(row.quantity),
            unrealized_pnl: coerce_decimal(row.unrealized_pnl),
            market_value: coerce_decimal(row.market_value),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TradeGroupRow {
    account: Option<String>,
    symbol: Option<String>,
    trade_symbol: Option<String>,
    strategy: Option<String>,
    trade_group_type: Option<String>,
    open_date: Option<String>,
    close_date: Option<String>,
    total_pnl: Option<f64>,
    days_in_trade: Option<i64>,
    num_trades: Option<i64>,
}

impl From<TradeGroupRow> for ClosedTradeGroup {
    fn from(row: TradeGroupRow) -> Self {
        Self {
            account: row.account.unwrap_or_default(),
            symbol: row.symbol.unwrap_or_default(),
            trade_symbol: row.trade_symbol.unwrap_or_default(),
            strategy: row.strategy.unwrap_or_default(),
            trade_group_type: row.trade_group_type.unwrap_or_default(),
            open_date: parse_date(row.open_date.as_deref()),
            close_date: parse_date(row.close_date.as_deref()),
            total_pnl: coerce_decimal(row.total_pnl),
            days_in_trade: row.days_in_trade.unwrap_or_default(),
            num_trades: row.num_trades.unwrap_or_default(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JournalEntryRow {
    account: Option<String>,
    symbol: Option<String>,
    strategy: Option<String>,
    trade_open_date: Option<String>,
    mood: Option<String>,
    tags: Option<String>,
    reflection: Option<String>,
}

impl From<JournalEntryRow> for JournalEntry {
    fn from(row: JournalEntryRow) -> Self {
        Self {
            account: row.account.unwrap_or_default(),
            symbol: row.symbol.unwrap_or_default(),
            strategy: row.strategy.unwrap_or_default(),
            trade_open_date: parse_date(row.trade_open_date.as_deref()),
            mood: row.mood.filter(|m| !m.trim().is_empty()),
            tags: row
                .tags
                .unwrap_or_default()
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            reflection: row.reflection,
        }
    }
}

/// Append the account restriction to a query whose WHERE clause is already open.
/// An empty allow-list matches nothing.
fn push_account_filter(query: &mut QueryBuilder<'_, Sqlite>, accounts: &AccountFilter) {
    match accounts {
        AccountFilter::All => {}
        AccountFilter::Only(list) if list.is_empty() => {
            query.push(" AND 1 = 0");
        }
        AccountFilter::Only(list) => {
            query.push(" AND account IN (");
            let mut separated = query.separated(", ");
            for account in list {
                separated.push_bind(account.clone());
            }
            separated.push_unseparated(")");
        }
    }
}

#[async_trait]
impl TransactionSource for LedgerDb {
    async fn trade_events(&self, accounts: &AccountFilter) -> Result<Vec<TradeEvent>, LedgerError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT account, symbol, trade_symbol, instrument_type, trade_date, action, quantity, amount \
             FROM trade_events WHERE 1 = 1",
        );
        push_account_filter(&mut query, accounts);
        query.push(" ORDER BY trade_date, id");

        let rows: Vec<TradeEventRow> = query
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;

        tracing::debug!(rows = rows.len(), "loaded trade events");
        Ok(rows.into_iter().map(TradeEvent::from).collect())
    }
}

#[async_trait]
impl PositionSource for LedgerDb {
    async fn position_snapshots(
        &self,
        accounts: &AccountFilter,
    ) -> Result<Vec<PositionSnapshot>, LedgerError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT account, symbol, trade_symbol, instrument_type, quantity, unrealized_pnl, market_value \
             FROM position_snapshots WHERE 1 = 1",
        );
        push_account_filter(&mut query, accounts);
        query.push(" ORDER BY account, symbol, id");

        let rows: Vec<PositionSnapshotRow> = query
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(PositionSnapshot::from).collect())
    }
}

#[async_trait]
impl TradeGroupSource for LedgerDb {
    async fn closed_trade_groups(
        &self,
        accounts: &AccountFilter,
    ) -> Result<Vec<ClosedTradeGroup>, LedgerError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT account, symbol, trade_symbol, strategy, trade_group_type, open_date, close_date, \
             total_pnl, days_in_trade, num_trades FROM trade_groups WHERE status = ",
        );
        query.push_bind(STATUS_CLOSED);
        push_account_filter(&mut query, accounts);
        query.push(" ORDER BY close_date DESC, id");

        let rows: Vec<TradeGroupRow> = query
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;

        tracing::debug!(rows = rows.len(), "loaded closed trade groups");
        Ok(rows.into_iter().map(ClosedTradeGroup::from).collect())
    }

    async fn group_open_dates(&self, accounts: &AccountFilter) -> Result<Vec<NaiveDate>, LedgerError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT open_date FROM trade_groups WHERE open_date IS NOT NULL",
        );
        push_account_filter(&mut query, accounts);

        let rows: Vec<(Option<String>,)> = query
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(open_date,)| parse_date(open_date.as_deref()))
            .collect())
    }
}

#[async_trait]
impl JournalSource for LedgerDb {
    async fn journal_entries(&self, accounts: &AccountFilter) -> Result<Vec<JournalEntry>, LedgerError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT account, symbol, strategy, trade_open_date, mood, tags, reflection \
             FROM journal_entries WHERE 1 = 1",
        );
        push_account_filter(&mut query, accounts);
        query.push(" ORDER BY id");

        let rows: Vec<JournalEntryRow> = query
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(JournalEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::STATUS_OPEN;
    use ledger_core::TradeAction;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn db() -> LedgerDb {
        LedgerDb::new("sqlite::memory:").await.unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn event(account: &str, action: TradeAction, qty: Decimal, amount: Decimal) -> TradeEvent {
        TradeEvent {
            account: account.to_string(),
            symbol: "AAPL".to_string(),
            trade_symbol: "AAPL".to_string(),
            instrument_type: InstrumentType::Equity,
            date: date(2024, 3, 1),
            action,
            quantity: qty,
            amount,
        }
    }

    fn group(account: &str, open: Option<NaiveDate>, close: Option<NaiveDate>, pnl: Decimal) -> ClosedTradeGroup {
        ClosedTradeGroup {
            account: account.to_string(),
            symbol: "AAPL".to_string(),
            trade_symbol: "AAPL".to_string(),
            strategy: "Covered Call".to_string(),
            trade_group_type: "options".to_string(),
            open_date: open,
            close_date: close,
            total_pnl: pnl,
            days_in_trade: 30,
            num_trades: 2,
        }
    }

    #[tokio::test]
    async fn test_trade_events_round_trip() {
        let db = db().await;
        let buy = event("IRA", TradeAction::Buy, dec!(10), dec!(-1000));
        db.insert_trade_event(&buy).await.unwrap();

        let events = db.trade_events(&AccountFilter::All).await.unwrap();
        assert_eq!(events, vec![buy]);
    }

    #[tokio::test]
    async fn test_raw_rows_are_coerced_on_read() {
        let db = db().await;
        db.insert_raw_trade(&RawTradeRow {
            account: Some("IRA".to_string()),
            symbol: Some(" msft ".to_string()),
            instrument_type: Some("stock".to_string()),
            trade_date: Some("not a date".to_string()),
            action: Some("Sell Short".to_string()),
            ..RawTradeRow::default()
        })
        .await
        .unwrap();

        let events = db.trade_events(&AccountFilter::All).await.unwrap();
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.symbol, "MSFT");
        assert_eq!(e.trade_symbol, "MSFT");
        assert_eq!(e.instrument_type, InstrumentType::Equity);
        assert_eq!(e.action, TradeAction::SellShort);
        assert_eq!(e.date, None);
        assert_eq!(e.quantity, Decimal::ZERO);
        assert_eq!(e.amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_account_filter_in_sql() {
        let db = db().await;
        db.insert_trade_event(&event("IRA", TradeAction::Buy, dec!(1), dec!(-10))).await.unwrap();
        db.insert_trade_event(&event("Brokerage", TradeAction::Buy, dec!(2), dec!(-20))).await.unwrap();
        db.insert_trade_event(&event("Joint", TradeAction::Buy, dec!(3), dec!(-30))).await.unwrap();

        let all = db.trade_events(&AccountFilter::All).await.unwrap();
        assert_eq!(all.len(), 3);

        let some = AccountFilter::Only(vec!["IRA".to_string(), "Joint".to_string()]);
        let mut accounts: Vec<String> = db
            .trade_events(&some)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.account)
            .collect();
        accounts.sort();
        assert_eq!(accounts, vec!["IRA".to_string(), "Joint".to_string()]);

        let none = db.trade_events(&AccountFilter::Only(vec![])).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_position_snapshots() {
        let db = db().await;
        db.insert_position_snapshot(&PositionSnapshot {
            account: "IRA".to_string(),
            symbol: "AAPL".to_string(),
            trade_symbol: "AAPL  240621C00200000".to_string(),
            instrument_type: InstrumentType::Call,
            quantity: dec!(-1),
            unrealized_pnl: dec!(42.5),
            market_value: dec!(-120),
        })
        .await
        .unwrap();

        let snapshots = db.position_snapshots(&AccountFilter::All).await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].instrument_type, InstrumentType::Call);
        assert_eq!(snapshots[0].unrealized_pnl, dec!(42.5));

        let other = AccountFilter::Only(vec!["Brokerage".to_string()]);
        assert!(db.position_snapshots(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_groups_and_open_dates() {
        let db = db().await;
        db.insert_trade_group(&group("IRA", date(2024, 1, 2), date(2024, 2, 1), dec!(150)), STATUS_CLOSED)
            .await
            .unwrap();
        db.insert_trade_group(&group("IRA", date(2024, 3, 1), None, dec!(0)), STATUS_OPEN)
            .await
            .unwrap();
        db.insert_trade_group(&group("IRA", None, date(2024, 4, 1), dec!(-20)), STATUS_CLOSED)
            .await
            .unwrap();

        let closed = db.closed_trade_groups(&AccountFilter::All).await.unwrap();
        assert_eq!(closed.len(), 2);
        assert_eq!(closed[0].close_date, date(2024, 4, 1));
        assert_eq!(closed[0].open_date, None);
        assert_eq!(closed[1].total_pnl, dec!(150));

        let mut opens = db.group_open_dates(&AccountFilter::All).await.unwrap();
        opens.sort();
        assert_eq!(opens, vec![date(2024, 1, 2).unwrap(), date(2024, 3, 1).unwrap()]);
    }

    #[tokio::test]
    async fn test_journal_entries() {
        let db = db().await;
        db.insert_journal_entry(&JournalEntry {
            account: "IRA".to_string(),
            symbol: "TSLA".to_string(),
            strategy: "Long Stock".to_string(),
            trade_open_date: date(2024, 6, 3),
            mood: Some("excited".to_string()),
            tags: vec!["fomo".to_string(), "breakout".to_string()],
            reflection: Some("chased the gap".to_string()),
        })
        .await
        .unwrap();

        let entries = db.journal_entries(&AccountFilter::All).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tags, vec!["fomo".to_string(), "breakout".to_string()]);
        assert_eq!(entries[0].trade_open_date, date(2024, 6, 3));

        let none = db.journal_entries(&AccountFilter::Only(vec![])).await.unwrap();
        assert!(none.is_empty());
    }
}

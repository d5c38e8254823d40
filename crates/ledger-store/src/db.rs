use chrono::NaiveDate;
use ledger_core::{
    ClosedTradeGroup, JournalEntry, LedgerError, LedgerResult, PositionSnapshot, RawTradeRow,
    TradeEvent,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Status stored on a trade group that is still open
pub const STATUS_OPEN: &str = "Open";
/// Status stored on a trade group that has been closed
pub const STATUS_CLOSED: &str = "Closed";

pub(crate) fn db_error(err: sqlx::Error) -> LedgerError {
    LedgerError::Database(err.to_string())
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn money(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[derive(Clone)]
pub struct LedgerDb {
    pool: SqlitePool,
}

impl LedgerDb {
    /// Open (or create) the ledger database and make sure the schema exists
    pub async fn new(database_url: &str) -> LedgerResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(db_error)?
            .create_if_missing(true);

        // every in-memory connection is its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        let db = Self { pool };
        db.init_schema().await?;

        tracing::debug!(database_url, "ledger database ready");
        Ok(db)
    }

    async fn init_schema(&self) -> LedgerResult<()> {
        let schema = include_str!("../schema.sql");

        // sqlx runs one statement per query
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt)
                    .execute(&self.pool)
                    .await
                    .map_err(db_error)?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Store an imported row as-is. Missing fields stay NULL and are coerced
    /// when read back.
    pub async fn insert_raw_trade(&self, row: &RawTradeRow) -> LedgerResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO trade_events
                (account, symbol, trade_symbol, instrument_type, trade_date, action, quantity, amount)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.account)
        .bind(&row.symbol)
        .bind(&row.trade_symbol)
        .bind(&row.instrument_type)
        .bind(&row.trade_date)
        .bind(&row.action)
        .bind(row.quantity)
        .bind(row.amount)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.last_insert_rowid())
    }

    pub async fn insert_trade_event(&self, event: &TradeEvent) -> LedgerResult<i64> {
        let row = RawTradeRow {
            account: Some(event.account.clone()),
            symbol: Some(event.symbol.clone()),
            trade_symbol: Some(event.trade_symbol.clone()),
            instrument_type: Some(event.instrument_type.as_str().to_string()),
            trade_date: date_text(event.date),
            action: Some(event.action.as_str().to_string()),
            quantity: event.quantity.to_f64(),
            amount: event.amount.to_f64(),
        };
        self.insert_raw_trade(&row).await
    }

    pub async fn insert_position_snapshot(&self, snapshot: &PositionSnapshot) -> LedgerResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO position_snapshots
                (account, symbol, trade_symbol, instrument_type, quantity, unrealized_pnl, market_value)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&snapshot.account)
        .bind(&snapshot.symbol)
        .bind(&snapshot.trade_symbol)
        .bind(snapshot.instrument_type.as_str())
        .bind(money(snapshot.quantity))
        .bind(money(snapshot.unrealized_pnl))
        .bind(money(snapshot.market_value))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.last_insert_rowid())
    }

    /// Store a trade group with the given status (`STATUS_OPEN` or `STATUS_CLOSED`)
    pub async fn insert_trade_group(&self, group: &ClosedTradeGroup, status: &str) -> LedgerResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO trade_groups
                (account, symbol, trade_symbol, strategy, trade_group_type, status,
                 open_date, close_date, total_pnl, days_in_trade, num_trades)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&group.account)
        .bind(&group.symbol)
        .bind(&group.trade_symbol)
        .bind(&group.strategy)
        .bind(&group.trade_group_type)
        .bind(status)
        .bind(date_text(group.open_date))
        .bind(date_text(group.close_date))
        .bind(money(group.total_pnl))
        .bind(group.days_in_trade)
        .bind(group.num_trades)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.last_insert_rowid())
    }

    pub async fn insert_journal_entry(&self, entry: &JournalEntry) -> LedgerResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO journal_entries
                (account, symbol, strategy, trade_open_date, mood, tags, reflection)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.account)
        .bind(&entry.symbol)
        .bind(&entry.strategy)
        .bind(date_text(entry.trade_open_date))
        .bind(&entry.mood)
        .bind(entry.tags.join(","))
        .bind(&entry.reflection)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_db_creation() {
        let db = LedgerDb::new("sqlite::memory:").await.unwrap();
        assert!(db.pool().acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let db = LedgerDb::new("sqlite::memory:").await.unwrap();
        db.init_schema().await.unwrap();

        let id = db.insert_raw_trade(&RawTradeRow::default()).await.unwrap();
        assert_eq!(id, 1);
    }
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::parse::{coerce_decimal, parse_date};

/// Instrument classification of a ledger line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstrumentType {
    Equity,
    Call,
    Put,
    Dividend,
    Other,
}

impl InstrumentType {
    /// Map an importer label onto an instrument type. Unknown labels are `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "equity" | "stock" | "etf" => Self::Equity,
            "call" => Self::Call,
            "put" => Self::Put,
            "dividend" => Self::Dividend,
            _ => Self::Other,
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self, Self::Call | Self::Put)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equity => "Equity",
            Self::Call => "Call",
            Self::Put => "Put",
            Self::Dividend => "Dividend",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger action. Anything unrecognised is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TradeAction {
    Buy,
    Sell,
    SellShort,
    Dividend,
    Other(String),
}

impl TradeAction {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(' ', "_");
        match normalized.as_str() {
            "buy" => Self::Buy,
            "sell" => Self::Sell,
            "sell_short" => Self::SellShort,
            "dividend" => Self::Dividend,
            _ => Self::Other(normalized),
        }
    }

    /// Sell-type actions realize equity P&L.
    pub fn is_sell(&self) -> bool {
        matches!(self, Self::Sell | Self::SellShort)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::SellShort => "sell_short",
            Self::Dividend => "dividend",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TradeAction {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<TradeAction> for String {
    fn from(action: TradeAction) -> Self {
        action.as_str().to_string()
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ledger line produced by the importer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub account: String,
    /// Underlying symbol
    pub symbol: String,
    /// Option contract or equity identifier
    pub trade_symbol: String,
    pub instrument_type: InstrumentType,
    /// `None` when the source date did not parse
    pub date: Option<NaiveDate>,
    pub action: TradeAction,
    /// Signed or unsigned depending on the source
    pub quantity: Decimal,
    /// Signed cash flow, positive = cash in
    pub amount: Decimal,
}

/// Untyped ledger row as handed over by an importer or a warehouse query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTradeRow {
    pub account: Option<String>,
    pub symbol: Option<String>,
    pub trade_symbol: Option<String>,
    pub instrument_type: Option<String>,
    pub trade_date: Option<String>,
    pub action: Option<String>,
    pub quantity: Option<f64>,
    pub amount: Option<f64>,
}

impl From<RawTradeRow> for TradeEvent {
    fn from(row: RawTradeRow) -> Self {
        let symbol = row.symbol.unwrap_or_default().trim().to_uppercase();
        let trade_symbol = row
            .trade_symbol
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| symbol.clone());

        Self {
            account: row.account.unwrap_or_default(),
            symbol,
            trade_symbol,
            instrument_type: row
                .instrument_type
                .as_deref()
                .map(InstrumentType::parse)
                .unwrap_or(InstrumentType::Other),
            date: parse_date(row.trade_date.as_deref()),
            action: TradeAction::parse(row.action.as_deref().unwrap_or_default()),
            quantity: coerce_decimal(row.quantity),
            amount: coerce_decimal(row.amount),
        }
    }
}

/// Current open-position state for one contract or share line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub account: String,
    pub symbol: String,
    pub trade_symbol: String,
    pub instrument_type: InstrumentType,
    pub quantity: Decimal,
    pub unrealized_pnl: Decimal,
    pub market_value: Decimal,
}

/// A fully closed position, as classified upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTradeGroup {
    pub account: String,
    pub symbol: String,
    pub trade_symbol: String,
    pub strategy: String,
    pub trade_group_type: String,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    /// Net of fees
    pub total_pnl: Decimal,
    pub days_in_trade: i64,
    pub num_trades: i64,
}

/// A trade journal entry written by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub account: String,
    pub symbol: String,
    pub strategy: String,
    pub trade_open_date: Option<NaiveDate>,
    pub mood: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub reflection: Option<String>,
}

/// Which accounts a caller may see.
///
/// `All` is the admin view; `Only(vec![])` matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccountFilter {
    #[default]
    All,
    Only(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_instrument_type_parse() {
        assert_eq!(InstrumentType::parse("Equity"), InstrumentType::Equity);
        assert_eq!(InstrumentType::parse(" call "), InstrumentType::Call);
        assert_eq!(InstrumentType::parse("PUT"), InstrumentType::Put);
        assert_eq!(InstrumentType::parse("Dividend"), InstrumentType::Dividend);
        assert_eq!(InstrumentType::parse("fee"), InstrumentType::Other);
        assert!(InstrumentType::Put.is_option());
        assert!(!InstrumentType::Equity.is_option());
    }

    #[test]
    fn test_trade_action_parse() {
        assert_eq!(TradeAction::parse("Buy"), TradeAction::Buy);
        assert_eq!(TradeAction::parse("sell short"), TradeAction::SellShort);
        assert_eq!(TradeAction::parse("sell_short"), TradeAction::SellShort);
        assert!(TradeAction::parse("SELL").is_sell());
        assert_eq!(
            TradeAction::parse("Buy To Open"),
            TradeAction::Other("buy_to_open".to_string())
        );
    }

    #[test]
    fn test_trade_action_serde_as_string() {
        let json = serde_json::to_string(&TradeAction::SellShort).unwrap();
        assert_eq!(json, "\"sell_short\"");
        let back: TradeAction = serde_json::from_str("\"dividend\"").unwrap();
        assert_eq!(back, TradeAction::Dividend);
    }

    #[test]
    fn test_raw_row_coercion() {
        let row = RawTradeRow {
            account: Some("IRA".to_string()),
            symbol: Some(" aapl ".to_string()),
            trade_symbol: None,
            instrument_type: Some("Equity".to_string()),
            trade_date: Some("garbage".to_string()),
            action: Some("Buy".to_string()),
            quantity: None,
            amount: Some(f64::NAN),
        };

        let event = TradeEvent::from(row);
        assert_eq!(event.symbol, "AAPL");
        assert_eq!(event.trade_symbol, "AAPL");
        assert_eq!(event.date, None);
        assert_eq!(event.quantity, Decimal::ZERO);
        assert_eq!(event.amount, Decimal::ZERO);
    }

    #[test]
    fn test_raw_row_full() {
        let row = RawTradeRow {
            account: Some("Brokerage".to_string()),
            symbol: Some("SPY".to_string()),
            trade_symbol: Some("SPY 240315C500".to_string()),
            instrument_type: Some("Call".to_string()),
            trade_date: Some("2024-03-01".to_string()),
            action: Some("sell_to_open".to_string()),
            quantity: Some(-1.0),
            amount: Some(245.5),
        };

        let event = TradeEvent::from(row);
        assert_eq!(event.instrument_type, InstrumentType::Call);
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(event.quantity, dec!(-1));
        assert_eq!(event.amount, dec!(245.5));
    }
}

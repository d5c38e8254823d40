//! Ledger Core
//!
//! Shared data model for the options dashboard: trade events, position
//! snapshots, closed trade groups and journal entries, plus the permissive
//! coercion rules every importer row goes through.

pub mod error;
pub mod parse;
pub mod traits;
pub mod types;

pub use error::*;
pub use parse::{coerce_decimal, parse_date, round_money, MAX_LEDGER_MAGNITUDE};
pub use traits::*;
pub use types::*;

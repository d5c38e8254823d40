//! Ledger Store
//!
//! SQLite storage for the dashboard ledger. `LedgerDb` implements every
//! source trait from `ledger-core`, applying account restrictions in SQL.

pub mod db;
pub mod sources;

pub use db::{LedgerDb, STATUS_CLOSED, STATUS_OPEN};

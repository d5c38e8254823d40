use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

//! Perdiem is a daily-allowance budget tracker: set a monthly budget, record
//! expenses against it, and the remaining budget is spread evenly across the
//! remaining days of the month.
//!
//! [Ledger] is the entry point. It owns the SQLite connection, keeps two
//! persisted balances per account (the remaining monthly total and today's
//! share of it), and re-derives today's share from the total at most once per
//! local calendar day. The arithmetic behind that lives in the pure
//! [daily_share] function.

#![warn(missing_docs)]

mod account;
mod allowance;
mod db;
mod ledger;
mod pagination;
mod timezone;
mod transaction;

pub use account::{
    Account, DEFAULT_ACCOUNT_ID, create_account_table, get_account, map_account_row,
    update_account_balances, update_account_recalc, upsert_account,
};
pub use allowance::{daily_share, from_epoch_ms, round_cents, round_whole};
pub use db::initialize as initialize_db;
pub use ledger::{DEFAULT_BUDGET, Ledger};
pub use pagination::PaginationConfig;
pub use timezone::{local_offset, offset_at};
pub use transaction::{
    TimestampMs, Transaction, TransactionId, count_transactions, create_transaction,
    create_transaction_table, list_transactions, map_transaction_row, paginate_transactions,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The expense store could not be reached: the database file cannot be
    /// opened, another process holds it, or the disk failed underneath it.
    ///
    /// This is the only failure the caller is expected to show to the user;
    /// everything else is an internal error.
    #[error("the expense store is unavailable: {0}")]
    StoreUnavailable(String),

    /// The requested resource could not be found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The day-boundary recalculation of today's allowance failed.
    ///
    /// Balances are left as they were; the caller decides whether stale
    /// figures are acceptable for the current session.
    #[error("daily allowance recalculation failed: {0}")]
    RecalcFailed(Box<Error>),

    /// A zero, negative or non-finite amount was used to record an expense.
    #[error("{0} is not a positive expense amount")]
    NonPositiveAmount(f64),

    /// A zero, negative or non-finite amount was used to set the budget.
    #[error("{0} is not a positive budget")]
    NonPositiveBudget(f64),

    /// A stored epoch-millisecond timestamp does not map to a representable
    /// instant.
    #[error("{0} is not a representable epoch-millisecond timestamp")]
    InvalidTimestamp(i64),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, message)
                if matches!(
                    sql_error.code,
                    rusqlite::ErrorCode::DatabaseBusy
                        | rusqlite::ErrorCode::DatabaseLocked
                        | rusqlite::ErrorCode::CannotOpen
                        | rusqlite::ErrorCode::SystemIoFailure
                ) =>
            {
                Error::StoreUnavailable(message.unwrap_or_else(|| sql_error.to_string()))
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

//! Defines the account aggregate and its database queries.
//!
//! One installation keeps a single account row holding the monthly budget
//! and the two balances derived from it. The row is keyed by an explicit id
//! so the query functions stay free of ambient state.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, transaction::TimestampMs};

/// The account id used when none is configured.
pub const DEFAULT_ACCOUNT_ID: &str = "account";

/// The monthly budget and the balances derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id of the account row.
    pub id: String,
    /// The monthly budget total.
    pub budget: f64,
    /// The budget minus every expense recorded since it was last set.
    pub total_balance: f64,
    /// The portion of [Account::total_balance] allocated to the current day,
    /// minus today's expenses.
    pub todays_balance: f64,
    /// The local start of the day on which `todays_balance` was last derived
    /// from `total_balance`, in epoch milliseconds.
    pub last_recalc_timestamp: TimestampMs,
}

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id TEXT PRIMARY KEY,
                budget REAL NOT NULL,
                total_balance REAL NOT NULL,
                todays_balance REAL NOT NULL,
                last_recalc_timestamp INTEGER NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to an Account.
pub fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let budget = row.get(1)?;
    let total_balance = row.get(2)?;
    let todays_balance = row.get(3)?;
    let last_recalc_timestamp = row.get(4)?;

    Ok(Account {
        id,
        budget,
        total_balance,
        todays_balance,
        last_recalc_timestamp,
    })
}

/// Retrieve the account with `id` from the database.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no account row has `id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_account(id: &str, connection: &Connection) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "SELECT id, budget, total_balance, todays_balance, last_recalc_timestamp
             FROM account WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_account_row)?;

    Ok(account)
}

/// Write the full account row, replacing any existing row with the same id.
///
/// This is the write used when a budget is set: every field is overwritten,
/// none are merged.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn upsert_account(account: &Account, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO account (id, budget, total_balance, todays_balance, last_recalc_timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             budget = excluded.budget,
             total_balance = excluded.total_balance,
             todays_balance = excluded.todays_balance,
             last_recalc_timestamp = excluded.last_recalc_timestamp",
        (
            &account.id,
            account.budget,
            account.total_balance,
            account.todays_balance,
            account.last_recalc_timestamp,
        ),
    )?;

    Ok(())
}

/// Update only the two balance fields of the account with `id`.
///
/// The budget and the recalculation timestamp are left untouched.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no account row has `id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_account_balances(
    id: &str,
    todays_balance: f64,
    total_balance: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE account SET todays_balance = ?1, total_balance = ?2 WHERE id = ?3",
        (todays_balance, total_balance, id),
    )?;

    if rows_updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Update only the recalculation timestamp and today's balance of the
/// account with `id`.
///
/// This is the day-boundary write: the budget and the total balance are left
/// untouched.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no account row has `id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_account_recalc(
    id: &str,
    last_recalc_timestamp: TimestampMs,
    todays_balance: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE account SET last_recalc_timestamp = ?1, todays_balance = ?2 WHERE id = ?3",
        (last_recalc_timestamp, todays_balance, id),
    )?;

    if rows_updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

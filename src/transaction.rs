//! Defines the expense records and their database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::Error;

/// An instant in epoch milliseconds. Expense ordering and history cursors
/// use this representation.
pub type TimestampMs = i64;

/// The database id of an expense row.
pub type TransactionId = i64;

/// A single recorded expense.
///
/// Expenses are immutable once created and listed newest first by
/// [Transaction::timestamp]. They are never re-read to rebuild the account
/// balances; the balances are decremented when the expense is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The id of the expense row. Only tie-breaks the display order when two
    /// expenses share a timestamp.
    pub id: TransactionId,
    /// When the expense was recorded, in epoch milliseconds.
    pub timestamp: TimestampMs,
    /// What the money was spent on. May be empty.
    pub comment: String,
    /// The positive amount spent.
    pub outcome: f64,
}

/// Create the transactions table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                comment TEXT NOT NULL,
                outcome REAL NOT NULL
                )",
        (),
    )?;

    // Newest-first listing and cursor pagination both scan this index.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_timestamp
         ON transactions(timestamp DESC, id DESC);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let timestamp = row.get(1)?;
    let comment = row.get(2)?;
    let outcome = row.get(3)?;

    Ok(Transaction {
        id,
        timestamp,
        comment,
        outcome,
    })
}

/// Append a new expense to the log.
///
/// Appends unconditionally: there is no deduplication and no idempotency
/// key, so retrying a failed call may record the expense twice.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    timestamp: TimestampMs,
    comment: &str,
    outcome: f64,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO transactions (timestamp, comment, outcome)
             VALUES (?1, ?2, ?3)
             RETURNING id, timestamp, comment, outcome",
        )?
        .query_one((timestamp, comment, outcome), map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve up to `limit` expenses, newest first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_transactions(limit: u64, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, timestamp, comment, outcome FROM transactions
             ORDER BY timestamp DESC, id DESC LIMIT :limit",
        )?
        .query_map(&[(":limit", &limit)], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Retrieve up to `limit` expenses strictly older than `before`, newest
/// first.
///
/// Returns an empty vector once the log is exhausted; callers should stop
/// requesting further pages at that point.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn paginate_transactions(
    limit: u64,
    before: TimestampMs,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, timestamp, comment, outcome FROM transactions
             WHERE timestamp < ?1
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?
        .query_map((before, limit), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get the total number of expenses in the database.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM transactions;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;

    use crate::db::initialize;

    use super::{
        count_transactions, create_transaction, list_transactions, paginate_transactions,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_succeeds_with_empty_comment() {
        let conn = get_test_connection();

        let result = create_transaction(1_000, "", 250.0, &conn);

        match result {
            Ok(transaction) => {
                assert_eq!(transaction.timestamp, 1_000);
                assert_eq!(transaction.comment, "");
                assert_eq!(transaction.outcome, 250.0);
            }
            Err(error) => panic!("Unexpected error: {error}"),
        }
    }

    #[test]
    fn list_returns_newest_first() {
        let conn = get_test_connection();
        for timestamp in [3_000, 1_000, 2_000] {
            create_transaction(timestamp, "coffee", 3.5, &conn).unwrap();
        }

        let got = list_transactions(10, &conn).unwrap();

        let timestamps: Vec<i64> = got.iter().map(|transaction| transaction.timestamp).collect();
        assert_eq!(timestamps, [3_000, 2_000, 1_000]);
    }

    #[test]
    fn list_honours_the_limit() {
        let conn = get_test_connection();
        for timestamp in 1..=20 {
            create_transaction(timestamp, "", 1.0, &conn).unwrap();
        }

        let got = list_transactions(10, &conn).unwrap();

        assert_eq!(got.len(), 10);
        assert_eq!(got[0].timestamp, 20);
    }

    #[test]
    fn pagination_returns_strictly_older_rows() {
        let conn = get_test_connection();
        for timestamp in 1..=10 {
            create_transaction(timestamp, "", 1.0, &conn).unwrap();
        }

        let got = paginate_transactions(3, 8, &conn).unwrap();

        let timestamps: Vec<i64> = got.iter().map(|transaction| transaction.timestamp).collect();
        // The row at the cursor itself is excluded.
        assert_eq!(timestamps, [7, 6, 5]);
    }

    #[test]
    fn pagination_returns_empty_page_when_exhausted() {
        let conn = get_test_connection();
        for timestamp in 1..=3 {
            create_transaction(timestamp, "", 1.0, &conn).unwrap();
        }

        let got = paginate_transactions(15, 1, &conn).unwrap();

        assert!(got.is_empty());
    }

    #[test]
    fn same_timestamp_rows_keep_insertion_order() {
        let conn = get_test_connection();
        let first = create_transaction(5_000, "first", 1.0, &conn).unwrap();
        let second = create_transaction(5_000, "second", 2.0, &conn).unwrap();

        let got = list_transactions(10, &conn).unwrap();

        assert_eq!(got, [second, first]);
    }

    #[test]
    fn get_count() {
        let conn = get_test_connection();
        let want_count = 20;
        for i in 1..=want_count {
            create_transaction(i as i64, "", i as f64, &conn)
                .expect("Could not create transaction");
        }

        let got_count = count_transactions(&conn).expect("Could not get count");

        assert_eq!(want_count, got_count);
    }
}

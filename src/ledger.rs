//! The ledger engine: one budget, two running balances and an expense log.
//!
//! [Ledger] wires the pure allowance arithmetic to the SQLite store. Every
//! account mutation goes through one connection lock, and recording an
//! expense appends the row and decrements both balances inside a single SQL
//! transaction, so concurrent calls cannot lose an update and a failure
//! cannot leave the log and the balances disagreeing.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::{
    Error, account,
    account::{Account, DEFAULT_ACCOUNT_ID},
    allowance, db,
    pagination::PaginationConfig,
    timezone,
    transaction::{self, TimestampMs, Transaction},
};

/// The budget used when no account exists yet.
pub const DEFAULT_BUDGET: f64 = 30_000.0;

/// The daily-allowance ledger over a SQLite database.
///
/// Clocked operations come in pairs: the plain form reads the wall clock in
/// the ledger's timezone, the `*_at` form takes the instant as an argument.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// The database connection.
    connection: Arc<Mutex<Connection>>,
    /// The id of the account row this ledger operates on.
    account_id: String,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    local_timezone: String,
    /// The config that controls how many expenses to return per page.
    pagination_config: PaginationConfig,
}

impl Ledger {
    /// Create a new [Ledger] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models. `local_timezone` should be a valid, canonical
    /// timezone name; it determines where the day boundary falls.
    ///
    /// # Errors
    /// Returns an error if the timezone is not recognized or the database
    /// cannot be initialized.
    pub fn new(
        connection: Connection,
        local_timezone: &str,
        pagination_config: PaginationConfig,
    ) -> Result<Self, Error> {
        timezone::local_offset(local_timezone)?;
        db::initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            account_id: DEFAULT_ACCOUNT_ID.to_owned(),
            local_timezone: local_timezone.to_owned(),
            pagination_config,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| Error::DatabaseLock)
    }

    fn now_local(&self) -> Result<OffsetDateTime, Error> {
        let offset = timezone::local_offset(&self.local_timezone)?;

        Ok(OffsetDateTime::now_utc().to_offset(offset))
    }

    /// The instant of the last recalculation, in the wall-clock offset that
    /// was in effect at that instant.
    fn local_last_recalc(&self, account: &Account) -> Result<OffsetDateTime, Error> {
        let last_recalc_utc = allowance::from_epoch_ms(account.last_recalc_timestamp)?;
        let offset = timezone::offset_at(&self.local_timezone, last_recalc_utc)?;

        Ok(last_recalc_utc.to_offset(offset))
    }

    /// Replace the monthly budget.
    ///
    /// This is a destructive reset, not an adjustment: the remaining total
    /// becomes `amount` and today's allowance becomes `amount` spread over
    /// the remaining days of the month, rounded to cents. Expenses already
    /// recorded this period are not re-subtracted.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NonPositiveBudget] if `amount` is zero, negative or not finite,
    /// - or [Error::StoreUnavailable] / [Error::SqlError] if the write fails.
    pub fn set_budget(&self, amount: f64) -> Result<Account, Error> {
        self.set_budget_at(amount, self.now_local()?)
    }

    /// [Ledger::set_budget] with the clock supplied by the caller.
    pub fn set_budget_at(&self, amount: f64, now: OffsetDateTime) -> Result<Account, Error> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(Error::NonPositiveBudget(amount));
        }

        let account = self.reset_account(amount, now);

        let connection = self.lock()?;
        account::upsert_account(&account, &connection)?;

        tracing::info!(
            budget = account.budget,
            todays_balance = account.todays_balance,
            "budget replaced and balances reset"
        );

        Ok(account)
    }

    /// The account row a budget reset writes: both balances derived from
    /// `amount` alone.
    fn reset_account(&self, amount: f64, now: OffsetDateTime) -> Account {
        Account {
            id: self.account_id.clone(),
            budget: amount,
            total_balance: amount,
            todays_balance: allowance::round_cents(allowance::daily_share_for(amount, now.date())),
            last_recalc_timestamp: allowance::start_of_day_ms(now),
        }
    }

    /// Retrieve the current account.
    ///
    /// On the first run, when no account has been persisted yet, one is
    /// created with [DEFAULT_BUDGET] and returned.
    ///
    /// # Errors
    /// This function will return an [Error::StoreUnavailable] /
    /// [Error::SqlError] if the store cannot be read or the first-run
    /// account cannot be written.
    pub fn account(&self) -> Result<Account, Error> {
        self.account_at(self.now_local()?)
    }

    /// [Ledger::account] with the clock supplied by the caller.
    pub fn account_at(&self, now: OffsetDateTime) -> Result<Account, Error> {
        let result = {
            let connection = self.lock()?;
            account::get_account(&self.account_id, &connection)
        };

        match result {
            Err(Error::NotFound) => {
                tracing::info!("no account found, creating one with the default budget");
                self.set_budget_at(DEFAULT_BUDGET, now)
            }
            other => other,
        }
    }

    /// Derive a fresh daily allowance if the last recalculation happened on
    /// an earlier calendar day.
    ///
    /// When due, today's allowance becomes the remaining total spread over
    /// the remaining days of the month, rounded to whole currency units (a
    /// coarser rounding than [Ledger::set_budget] applies; see
    /// [crate::round_whole]). Only the allowance and the recalculation
    /// timestamp are written; the budget and the remaining total are never
    /// touched. Within the same calendar day this is a no-op, so callers can
    /// run it on every start.
    ///
    /// # Errors
    /// Returns [Error::RecalcFailed] wrapping the underlying failure.
    /// Balances are left as they were.
    pub fn ensure_daily_recalc(&self) -> Result<(), Error> {
        self.ensure_daily_recalc_at(self.now_local()?)
    }

    /// [Ledger::ensure_daily_recalc] with the clock supplied by the caller.
    pub fn ensure_daily_recalc_at(&self, now: OffsetDateTime) -> Result<(), Error> {
        self.recalc_todays_balance(now)
            .map_err(|error| Error::RecalcFailed(Box::new(error)))
    }

    fn recalc_todays_balance(&self, now: OffsetDateTime) -> Result<(), Error> {
        // One exclusive SQL transaction covers the read, the day-boundary
        // check and the write. Otherwise an expense could commit in between
        // and have its decrement overwritten with an allowance derived from
        // the stale total.
        let connection = self.lock()?;
        let sql_transaction =
            SqlTransaction::new_unchecked(&connection, TransactionBehavior::Exclusive)?;

        let account = match account::get_account(&self.account_id, &sql_transaction) {
            Ok(account) => account,
            Err(Error::NotFound) => {
                tracing::info!("no account found, creating one with the default budget");
                let account = self.reset_account(DEFAULT_BUDGET, now);
                account::upsert_account(&account, &sql_transaction)?;
                account
            }
            Err(error) => return Err(error),
        };

        let last_recalc = self.local_last_recalc(&account)?;

        if allowance::is_same_local_day(now, last_recalc) {
            return sql_transaction.commit().map_err(Error::from);
        }

        let todays_balance =
            allowance::round_whole(allowance::daily_share_for(account.total_balance, now.date()));

        account::update_account_recalc(
            &self.account_id,
            allowance::start_of_day_ms(now),
            todays_balance,
            &sql_transaction,
        )?;

        sql_transaction.commit()?;

        tracing::info!(
            todays_balance,
            date = %now.date(),
            "derived a new daily allowance"
        );

        Ok(())
    }

    /// Record an expense and decrement both balances by its amount.
    ///
    /// The append and the balance update happen in one exclusive SQL
    /// transaction. An empty comment is accepted.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NonPositiveAmount] if `outcome` is zero, negative or not finite,
    /// - [Error::NotFound] if no account has been created yet,
    /// - or [Error::StoreUnavailable] / [Error::SqlError] if a write fails.
    pub fn record_expense(&self, comment: &str, outcome: f64) -> Result<Transaction, Error> {
        self.record_expense_at(comment, outcome, self.now_local()?)
    }

    /// [Ledger::record_expense] with the clock supplied by the caller.
    pub fn record_expense_at(
        &self,
        comment: &str,
        outcome: f64,
        now: OffsetDateTime,
    ) -> Result<Transaction, Error> {
        if !(outcome.is_finite() && outcome > 0.0) {
            return Err(Error::NonPositiveAmount(outcome));
        }

        let connection = self.lock()?;
        let sql_transaction =
            SqlTransaction::new_unchecked(&connection, TransactionBehavior::Exclusive)?;

        let expense = transaction::create_transaction(
            allowance::epoch_ms(now),
            comment,
            outcome,
            &sql_transaction,
        )?;
        let account = account::get_account(&self.account_id, &sql_transaction)?;
        account::update_account_balances(
            &self.account_id,
            account.todays_balance - outcome,
            account.total_balance - outcome,
            &sql_transaction,
        )?;

        sql_transaction.commit()?;

        tracing::info!(outcome, "recorded expense");

        Ok(expense)
    }

    /// The most recent expenses, newest first, one recent-view page long.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is an SQL error.
    pub fn recent_transactions(&self) -> Result<Vec<Transaction>, Error> {
        let connection = self.lock()?;

        transaction::list_transactions(self.pagination_config.recent_page_size, &connection)
    }

    /// One page of expense history, newest first.
    ///
    /// Pass `None` for the newest page. To continue, pass the timestamp of
    /// the last expense of the previous page; the next page is strictly
    /// older than that cursor. An empty page means the log is exhausted and
    /// callers should stop requesting further pages.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is an SQL error.
    pub fn history_page(&self, before: Option<TimestampMs>) -> Result<Vec<Transaction>, Error> {
        let connection = self.lock()?;
        let limit = self.pagination_config.history_page_size;

        match before {
            None => transaction::list_transactions(limit, &connection),
            Some(cursor) => transaction::paginate_transactions(limit, cursor, &connection),
        }
    }

    /// The number of expenses a full history page contains.
    ///
    /// A [Ledger::history_page] shorter than this means the log is
    /// exhausted.
    pub fn history_page_size(&self) -> u64 {
        self.pagination_config.history_page_size
    }

    /// The total number of recorded expenses.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is an SQL error.
    pub fn transaction_count(&self) -> Result<u64, Error> {
        let connection = self.lock()?;

        transaction::count_transactions(&connection)
    }
}

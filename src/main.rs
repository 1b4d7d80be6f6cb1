//! The command line front end for the perdiem ledger.

use std::sync::OnceLock;

use clap::{Parser, Subcommand};
use numfmt::{Formatter, Precision};
use rusqlite::Connection;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use perdiem::{Error, Ledger, PaginationConfig, TimestampMs, from_epoch_ms, offset_at};

/// A daily-allowance budget ledger.
///
/// Spreads a monthly budget evenly over the remaining days of the month and
/// tracks what is left of today's share.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the ledger SQLite database.
    #[arg(long, default_value = "perdiem.db")]
    db_path: String,

    /// The canonical timezone name that decides where the day boundary falls.
    #[arg(long, default_value = "UTC")]
    timezone: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the budget and the current balances.
    Status,
    /// Replace the monthly budget and reset both balances.
    SetBudget {
        /// The new monthly budget.
        amount: f64,
    },
    /// Record an expense against today's allowance.
    Spend {
        /// The amount spent.
        amount: f64,
        /// What the money was spent on.
        #[arg(default_value = "")]
        comment: String,
    },
    /// List expenses, newest first, one page at a time.
    History {
        /// Only show expenses strictly older than this epoch-millisecond timestamp.
        #[arg(long)]
        before: Option<TimestampMs>,
        /// Print the page as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    setup_logging();

    let args = Args::parse();

    if let Err(error) = run(args) {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    let connection = Connection::open(&args.db_path)?;
    let ledger = Ledger::new(connection, &args.timezone, PaginationConfig::default())?;

    if let Err(error) = ledger.ensure_daily_recalc() {
        tracing::warn!(%error, "could not derive today's allowance");
    }

    match args.command {
        Command::Status => {
            let account = ledger.account()?;
            println!("Budget:            {}", currency(account.budget));
            println!("Remaining total:   {}", currency(account.total_balance));
            println!("Today's allowance: {}", currency(account.todays_balance));
        }
        Command::SetBudget { amount } => {
            let account = ledger.set_budget(amount)?;
            println!(
                "Budget set to {}. Today's allowance is {}.",
                currency(account.budget),
                currency(account.todays_balance)
            );
        }
        Command::Spend { amount, comment } => {
            let expense = ledger.record_expense(&comment, amount)?;
            let account = ledger.account()?;
            println!(
                "Recorded {}. {} left today, {} left this month.",
                currency(expense.outcome),
                currency(account.todays_balance),
                currency(account.total_balance)
            );
        }
        Command::History { before, json } => print_history(&ledger, &args.timezone, before, json)?,
    }

    Ok(())
}

fn print_history(
    ledger: &Ledger,
    timezone: &str,
    before: Option<TimestampMs>,
    json: bool,
) -> Result<(), Error> {
    let page = ledger.history_page(before)?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&page).expect("an expense page serializes to JSON");
        println!("{rendered}");
        return Ok(());
    }

    if page.is_empty() {
        println!("No more expenses.");
        return Ok(());
    }

    for expense in &page {
        let comment = if expense.comment.is_empty() {
            "(no comment)"
        } else {
            &expense.comment
        };

        println!(
            "{}  {:>12}  {}",
            format_timestamp(timezone, expense.timestamp),
            currency(expense.outcome),
            comment
        );
    }

    if page.len() as u64 == ledger.history_page_size() {
        let cursor = page[page.len() - 1].timestamp;
        println!("For older expenses, pass --before {cursor}");
    }

    Ok(())
}

/// Renders an expense timestamp in the ledger's timezone, falling back to
/// the raw epoch-millisecond value if it cannot be interpreted.
fn format_timestamp(timezone: &str, timestamp: TimestampMs) -> String {
    from_epoch_ms(timestamp)
        .and_then(|instant| {
            let offset = offset_at(timezone, instant)?;
            instant
                .to_offset(offset)
                .format(&Rfc3339)
                .map_err(|_| Error::InvalidTimestamp(timestamp))
        })
        .unwrap_or_else(|_| timestamp.to_string())
}

fn currency(number: f64) -> String {
    // numfmt renders zero as a bare "0" with no symbol or decimals.
    if number == 0.0 {
        return "$0.00".to_owned();
    }

    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();
    static NEGATIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let formatter = if number < 0.0 {
        NEGATIVE_FMT.get_or_init(|| {
            Formatter::currency("-$")
                .unwrap()
                .precision(Precision::Decimals(2))
        })
    } else {
        POSITIVE_FMT.get_or_init(|| {
            Formatter::currency("$")
                .unwrap()
                .precision(Precision::Decimals(2))
        })
    };

    let mut rendered = formatter.fmt_string(number.abs());

    // numfmt drops a final trailing zero, rendering 12.30 as "12.3".
    if rendered.as_bytes()[rendered.len() - 3] != b'.' {
        rendered = format!("{rendered}0");
    }

    rendered
}

fn setup_logging() {
    let log_filter = filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_filter(log_filter),
        )
        .init();
}

#[cfg(test)]
mod currency_tests {
    use super::currency;

    #[test]
    fn renders_two_decimal_places() {
        assert_eq!(currency(1_034.48), "$1,034.48");
        assert_eq!(currency(12.3), "$12.30");
        assert_eq!(currency(0.0), "$0.00");
    }

    #[test]
    fn renders_negative_amounts_with_a_leading_sign() {
        assert_eq!(currency(-200.0), "-$200.00");
    }
}

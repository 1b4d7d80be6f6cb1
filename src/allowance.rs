//! The daily-allowance arithmetic.
//!
//! Everything in this module is a pure function of its arguments. Callers
//! supply the clock, so day-boundary behaviour can be tested with fixed
//! dates and is immune to where `now()` gets read.

use time::{Date, OffsetDateTime, Time};

use crate::Error;

/// The share of `remaining` allocated to each remaining day of the month,
/// today included: `remaining / (days_in_month - (day_of_month - 1))`.
///
/// On the first of the month this spreads `remaining` over the whole month;
/// on the last day the whole of `remaining` is today's to spend. Callers are
/// expected to pass a `day_of_month` that actually occurs in a month of
/// `days_in_month` days.
pub fn daily_share(remaining: f64, days_in_month: u8, day_of_month: u8) -> f64 {
    let days_left = i32::from(days_in_month) - (i32::from(day_of_month) - 1);

    remaining / f64::from(days_left)
}

/// [daily_share] with the month length and day of month taken from `date`.
pub fn daily_share_for(remaining: f64, date: Date) -> f64 {
    daily_share(remaining, date.month().length(date.year()), date.day())
}

/// Round to cents. Budget resets store today's allowance at this precision.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Round to whole currency units.
///
/// The overnight recalculation stores today's allowance in whole units while
/// budget resets keep cents (see [round_cents]). The asymmetry is part of
/// the observed balance behaviour and is kept deliberately.
pub fn round_whole(amount: f64) -> f64 {
    amount.round()
}

/// Epoch milliseconds for `instant`.
pub fn epoch_ms(instant: OffsetDateTime) -> i64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}

/// The instant `timestamp_ms` milliseconds after the Unix epoch, in UTC.
///
/// # Errors
/// Returns [Error::InvalidTimestamp] if the value falls outside the range
/// `OffsetDateTime` can represent.
pub fn from_epoch_ms(timestamp_ms: i64) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(timestamp_ms) * 1_000_000)
        .map_err(|_| Error::InvalidTimestamp(timestamp_ms))
}

/// Epoch milliseconds of midnight at the start of `now`'s calendar day, in
/// `now`'s own UTC offset.
pub fn start_of_day_ms(now: OffsetDateTime) -> i64 {
    epoch_ms(now.replace_time(Time::MIDNIGHT))
}

/// Whether two instants fall on the same calendar day.
///
/// Both values must already carry the wall-clock offset the comparison
/// should happen in.
pub fn is_same_local_day(a: OffsetDateTime, b: OffsetDateTime) -> bool {
    a.date() == b.date()
}


#[cfg(test)]
mod clock_tests {
    use time::macros::datetime;

    use super::{epoch_ms, from_epoch_ms, is_same_local_day, start_of_day_ms};

    #[test]
    fn epoch_ms_round_trips() {
        let instant = datetime!(2025 - 09 - 01 10:30:15.250 UTC);

        let round_tripped = from_epoch_ms(epoch_ms(instant)).unwrap();

        assert_eq!(round_tripped, instant);
    }

    #[test]
    fn start_of_day_keeps_the_local_offset() {
        let now = datetime!(2025 - 09 - 01 15:30 +3);
        let want = epoch_ms(datetime!(2025 - 09 - 01 00:00 +3));

        assert_eq!(start_of_day_ms(now), want);
    }

    #[test]
    fn same_day_at_different_times() {
        let morning = datetime!(2025 - 09 - 01 00:00 UTC);
        let evening = datetime!(2025 - 09 - 01 23:59:59 UTC);

        assert!(is_same_local_day(morning, evening));
    }

    #[test]
    fn midnight_starts_a_new_day() {
        let yesterday = datetime!(2025 - 09 - 01 23:59:59 UTC);
        let today = datetime!(2025 - 09 - 02 00:00 UTC);

        assert!(!is_same_local_day(yesterday, today));
    }

    #[test]
    fn month_boundary_is_a_new_day() {
        let last_of_september = datetime!(2025 - 09 - 30 12:00 UTC);
        let first_of_october = datetime!(2025 - 10 - 01 12:00 UTC);

        assert!(!is_same_local_day(last_of_september, first_of_october));
    }
}

//! Resolving canonical timezone names to UTC offsets.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Get the UTC offset of `canonical_timezone` (e.g. "Pacific/Auckland") at
/// the current instant.
///
/// # Errors
/// Returns [Error::InvalidTimezone] if the name is not a canonical timezone.
pub fn local_offset(canonical_timezone: &str) -> Result<UtcOffset, Error> {
    offset_at(canonical_timezone, OffsetDateTime::now_utc())
}

/// Get the UTC offset of `canonical_timezone` at `instant`.
///
/// Timezones change offset over the year, so mapping a stored timestamp back
/// to its local calendar day must use the offset that was in effect at that
/// instant, not the current one.
///
/// # Errors
/// Returns [Error::InvalidTimezone] if the name is not a canonical timezone.
pub fn offset_at(canonical_timezone: &str, instant: OffsetDateTime) -> Result<UtcOffset, Error> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|timezone| timezone.get_offset_utc(&instant).to_utc())
        .ok_or_else(|| Error::InvalidTimezone(canonical_timezone.to_owned()))
}

#[cfg(test)]
mod tests {
    use time::macros::{datetime, offset};

    use crate::Error;

    use super::offset_at;

    #[test]
    fn utc_resolves_to_zero_offset() {
        let got = offset_at("UTC", datetime!(2025 - 06 - 01 12:00 UTC)).unwrap();

        assert_eq!(got, offset!(+0));
    }

    #[test]
    fn offset_depends_on_the_instant() {
        // Berlin observes daylight saving: +2 in summer, +1 in winter.
        let summer = offset_at("Europe/Berlin", datetime!(2025 - 07 - 01 12:00 UTC)).unwrap();
        let winter = offset_at("Europe/Berlin", datetime!(2025 - 01 - 01 12:00 UTC)).unwrap();

        assert_eq!(summer, offset!(+2));
        assert_eq!(winter, offset!(+1));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let got = offset_at("Atlantis/Utopia", datetime!(2025 - 06 - 01 12:00 UTC));

        assert_eq!(got, Err(Error::InvalidTimezone("Atlantis/Utopia".to_owned())));
    }
}

//! The publishing window (spec.md §4.4, §8): promotions into
//! Security/Updates/Release are held back over the weekend release freeze.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

/// True Monday through Thursday; true on Friday before 18:00 UTC; true on
/// Sunday after 21:00 UTC (wall-clock hour strictly greater than 20);
/// false otherwise -- i.e. false from Friday 18:00 through Sunday 20:59
/// (ground: `original_source/stable/wfl/wft/promote_to_security.py`'s
/// `within_publishing_window`).
#[must_use]
pub fn within_publishing_window(now: DateTime<Utc>) -> bool {
    match now.weekday() {
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu => true,
        Weekday::Fri => now.hour() < 18,
        Weekday::Sat => false,
        Weekday::Sun => now.hour() > 20,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn weekday_is_always_open() {
        // 2026-01-05 is a Monday.
        assert!(within_publishing_window(at(2026, 1, 5, 3, 0)));
        assert!(within_publishing_window(at(2026, 1, 8, 23, 59))); // Thursday
    }

    #[test]
    fn friday_closes_at_eighteen_hundred() {
        // 2026-01-09 is a Friday.
        assert!(within_publishing_window(at(2026, 1, 9, 17, 59)));
        assert!(!within_publishing_window(at(2026, 1, 9, 18, 0)));
    }

    #[test]
    fn saturday_is_always_closed() {
        assert!(!within_publishing_window(at(2026, 1, 10, 0, 0)));
        assert!(!within_publishing_window(at(2026, 1, 10, 23, 59)));
    }

    #[test]
    fn sunday_reopens_after_twenty_one_hundred() {
        assert!(!within_publishing_window(at(2026, 1, 11, 20, 59)));
        assert!(within_publishing_window(at(2026, 1, 11, 21, 0)));
    }
}

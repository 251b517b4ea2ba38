// File: ./src/model/normalize.rs
// Lookup tables for unit, weekday and month abbreviations.
use chrono::Duration;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use strum::{Display, EnumIter};

/// Canonical offset units understood by the reminder grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum CanonicalUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Quarters,
    Years,
    Decades,
}

impl CanonicalUnit {
    /// Length of `amount` units. Months, quarters, years and decades are
    /// fixed day counts (30/90/365/3650), not calendar arithmetic.
    /// Returns `None` on overflow.
    pub fn span(self, amount: i64) -> Option<Duration> {
        match self {
            CanonicalUnit::Seconds => Duration::try_seconds(amount),
            CanonicalUnit::Minutes => Duration::try_minutes(amount),
            CanonicalUnit::Hours => Duration::try_hours(amount),
            CanonicalUnit::Days => Duration::try_days(amount),
            CanonicalUnit::Weeks => Duration::try_weeks(amount),
            CanonicalUnit::Months => Duration::try_days(amount.checked_mul(30)?),
            CanonicalUnit::Quarters => Duration::try_days(amount.checked_mul(90)?),
            CanonicalUnit::Years => Duration::try_days(amount.checked_mul(365)?),
            CanonicalUnit::Decades => Duration::try_days(amount.checked_mul(3650)?),
        }
    }
}

/// Weekday names and short forms, Monday = 0.
pub static WEEKDAY_NAMES: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("monday", 0),
        ("mon", 0),
        ("tuesday", 1),
        ("tue", 1),
        ("tues", 1),
        ("wednesday", 2),
        ("wed", 2),
        ("thursday", 3),
        ("thu", 3),
        ("thur", 3),
        ("thurs", 3),
        ("friday", 4),
        ("fri", 4),
        ("saturday", 5),
        ("sat", 5),
        ("sunday", 6),
        ("sun", 6),
    ])
});

/// Month names and short forms, January = 1.
pub static MONTH_NAMES: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("january", 1),
        ("jan", 1),
        ("february", 2),
        ("feb", 2),
        ("march", 3),
        ("mar", 3),
        ("april", 4),
        ("apr", 4),
        ("may", 5),
        ("june", 6),
        ("jun", 6),
        ("july", 7),
        ("jul", 7),
        ("august", 8),
        ("aug", 8),
        ("september", 9),
        ("sep", 9),
        ("sept", 9),
        ("october", 10),
        ("oct", 10),
        ("november", 11),
        ("nov", 11),
        ("december", 12),
        ("dec", 12),
    ])
});

/// Maps a unit spelling ("hr", "mins", "quarter", ...) to its canonical unit.
pub fn normalize_unit(raw: &str) -> Option<CanonicalUnit> {
    let unit = match raw.trim().to_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => CanonicalUnit::Seconds,
        "m" | "min" | "mins" | "minute" | "minutes" => CanonicalUnit::Minutes,
        "h" | "ho" | "hr" | "hrs" | "hour" | "hours" => CanonicalUnit::Hours,
        "d" | "day" | "days" => CanonicalUnit::Days,
        "w" | "wk" | "wks" | "week" | "weeks" => CanonicalUnit::Weeks,
        "mo" | "mon" | "mos" | "month" | "months" => CanonicalUnit::Months,
        "q" | "qtr" | "quarter" | "quarters" => CanonicalUnit::Quarters,
        "y" | "yr" | "yrs" | "year" | "years" => CanonicalUnit::Years,
        "decade" | "decades" => CanonicalUnit::Decades,
        _ => return None,
    };
    Some(unit)
}

/// Case-insensitive weekday lookup (Monday = 0).
pub fn weekday_index(name: &str) -> Option<u32> {
    WEEKDAY_NAMES.get(name.trim().to_lowercase().as_str()).copied()
}

/// Case-insensitive month lookup (January = 1).
pub fn month_number(name: &str) -> Option<u32> {
    MONTH_NAMES.get(name.trim().to_lowercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_abbreviations() {
        assert_eq!(normalize_unit("hr"), Some(CanonicalUnit::Hours));
        assert_eq!(normalize_unit("H"), Some(CanonicalUnit::Hours));
        assert_eq!(normalize_unit("mon"), Some(CanonicalUnit::Months));
        assert_eq!(normalize_unit("qtr"), Some(CanonicalUnit::Quarters));
        assert_eq!(normalize_unit(" wks "), Some(CanonicalUnit::Weeks));
        assert_eq!(normalize_unit("fortnight"), None);
    }

    #[test]
    fn test_canonical_names_are_fixed_points() {
        for unit in CanonicalUnit::iter() {
            let name = unit.to_string();
            assert_eq!(normalize_unit(&name), Some(unit), "{} did not round-trip", name);
        }
    }

    #[test]
    fn test_tables() {
        assert_eq!(weekday_index("Monday"), Some(0));
        assert_eq!(weekday_index("fri"), Some(4));
        assert_eq!(weekday_index("SUN"), Some(6));
        assert_eq!(weekday_index("funday"), None);
        assert_eq!(month_number("Aug"), Some(8));
        assert_eq!(month_number("december"), Some(12));
        assert_eq!(month_number("smarch"), None);
    }

    #[test]
    fn test_span_approximations() {
        assert_eq!(CanonicalUnit::Months.span(2), Some(Duration::days(60)));
        assert_eq!(CanonicalUnit::Quarters.span(1), Some(Duration::days(90)));
        assert_eq!(CanonicalUnit::Decades.span(1), Some(Duration::days(3650)));
        assert_eq!(CanonicalUnit::Seconds.span(i64::MAX), None);
    }
}

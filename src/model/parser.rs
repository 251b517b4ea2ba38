// File: ./src/model/parser.rs
// Resolves free-form reminder text ("tomorrow", "25 dec/27 9pm", "2 hours repeat")
// into an absolute local trigger instant.
use crate::model::normalize::{CanonicalUnit, month_number, normalize_unit, weekday_index};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// Suffix marking a reminder as recurring.
pub const REPEAT_SUFFIX: &str = " repeat";

const TODAY_HOUR: u32 = 15;
const TOMORROW_HOUR: u32 = 9;

/// Settings that influence resolution. Passed explicitly to every parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Hour used when an expression names a day but no time of day.
    pub default_start_hour: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_start_hour: 9,
        }
    }
}

impl ParserConfig {
    fn start_hour(&self) -> u32 {
        u32::from(self.default_start_hour.min(23))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyInput,
    UnknownUnit,
    UnknownWeekday,
    UnknownMonth,
    InvalidTime,
    InvalidDay,
    PastDate,
    Unparseable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::EmptyInput => write!(f, "empty input"),
            ErrorKind::UnknownUnit => write!(f, "unknown unit"),
            ErrorKind::UnknownWeekday => write!(f, "unknown weekday"),
            ErrorKind::UnknownMonth => write!(f, "unknown month"),
            ErrorKind::InvalidTime => write!(f, "invalid time"),
            ErrorKind::InvalidDay => write!(f, "invalid day"),
            ErrorKind::PastDate => write!(f, "date in the past"),
            ErrorKind::Unparseable => write!(f, "unparseable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl ParseFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseFailure {}

/// Outcome of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReminder {
    /// Always strictly after the `now` the parse was resolved against.
    pub trigger_instant: NaiveDateTime,
    /// Normalized expression to re-parse each time the reminder fires.
    pub recurrence_descriptor: Option<String>,
}

/// A recognized shape of reminder text, holding the pieces its resolver needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Form<'a> {
    Today,
    Tomorrow,
    Next {
        unit: &'a str,
    },
    Iso {
        date: &'a str,
        time: Option<&'a str>,
    },
    DayMonthYear {
        day: &'a str,
        month: &'a str,
        year: &'a str,
        time: Option<&'a str>,
    },
    DayMonth {
        day: u32,
        month: u32,
    },
    WeekdayAt {
        weekday: &'a str,
        time: &'a str,
    },
    Weekday {
        weekday: u32,
    },
    Amount {
        amount: &'a str,
        unit: &'a str,
    },
    DayOfMonth {
        day: &'a str,
    },
}

/// One entry of the grammar: a name (for diagnostics) and a shape matcher.
pub struct GrammarRule {
    pub name: &'static str,
    pub matcher: fn(&str) -> Option<Form<'_>>,
}

/// The reminder grammar in priority order. First match wins: several forms
/// are textual subsets of others ("25 aug" vs "2 hours", "monday 9" vs "monday").
pub const GRAMMAR: &[GrammarRule] = &[
    GrammarRule {
        name: "today",
        matcher: match_today,
    },
    GrammarRule {
        name: "tomorrow",
        matcher: match_tomorrow,
    },
    GrammarRule {
        name: "next-unit",
        matcher: match_next_unit,
    },
    GrammarRule {
        name: "iso",
        matcher: match_iso,
    },
    GrammarRule {
        name: "day-month-year",
        matcher: match_day_month_year,
    },
    GrammarRule {
        name: "day-month",
        matcher: match_day_month,
    },
    GrammarRule {
        name: "weekday-time",
        matcher: match_weekday_at,
    },
    GrammarRule {
        name: "weekday",
        matcher: match_weekday,
    },
    GrammarRule {
        name: "amount-unit",
        matcher: match_amount,
    },
    GrammarRule {
        name: "day-of-month",
        matcher: match_day_of_month,
    },
];

/// Parses reminder text relative to `now` using the standard grammar.
pub fn parse_reminder(
    text: &str,
    now: NaiveDateTime,
    config: &ParserConfig,
) -> Result<ResolvedReminder, ParseFailure> {
    parse_with_grammar(text, now, config, GRAMMAR)
}

pub fn parse_with_grammar(
    text: &str,
    now: NaiveDateTime,
    config: &ParserConfig,
    grammar: &[GrammarRule],
) -> Result<ResolvedReminder, ParseFailure> {
    let normalized = normalize_text(text);
    if normalized.is_empty() {
        return Err(ParseFailure::new(
            ErrorKind::EmptyInput,
            "Reminder text is empty",
        ));
    }

    let (expression, recurrence) = split_repeat(&normalized);

    let form = grammar
        .iter()
        .find_map(|rule| (rule.matcher)(expression))
        .ok_or_else(|| {
            ParseFailure::new(
                ErrorKind::Unparseable,
                format!("Could not parse reminder: '{}'", expression),
            )
        })?;

    let trigger = resolve(&form, now, config)?;
    if trigger <= now {
        return Err(ParseFailure::new(
            ErrorKind::PastDate,
            format!(
                "Reminder time {} is in the past",
                trigger.format("%Y-%m-%d %H:%M:%S")
            ),
        ));
    }

    Ok(ResolvedReminder {
        trigger_instant: trigger,
        recurrence_descriptor: recurrence.map(str::to_string),
    })
}

/// Returns the name of the grammar rule that would handle `text`, if any.
pub fn matching_rule(text: &str) -> Option<&'static str> {
    let normalized = normalize_text(text);
    let (expression, _) = split_repeat(&normalized);
    GRAMMAR
        .iter()
        .find(|rule| (rule.matcher)(expression).is_some())
        .map(|rule| rule.name)
}

// Inner whitespace is collapsed too, so stored descriptors come out canonical.
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn split_repeat(normalized: &str) -> (&str, Option<&str>) {
    match normalized.strip_suffix(REPEAT_SUFFIX) {
        Some(stripped) if !stripped.trim().is_empty() => (stripped.trim(), Some(stripped.trim())),
        _ => (normalized, None),
    }
}

// --- MATCHERS ---

fn match_today(text: &str) -> Option<Form<'_>> {
    (text == "today").then_some(Form::Today)
}

fn match_tomorrow(text: &str) -> Option<Form<'_>> {
    (text == "tomorrow").then_some(Form::Tomorrow)
}

fn match_next_unit(text: &str) -> Option<Form<'_>> {
    let (head, unit) = text.split_once(' ')?;
    if head == "next" && is_word(unit) {
        return Some(Form::Next { unit });
    }
    None
}

fn match_iso(text: &str) -> Option<Form<'_>> {
    if !text.is_ascii() {
        return None;
    }
    if text.len() == 10 && is_iso_date(text) {
        return Some(Form::Iso {
            date: text,
            time: None,
        });
    }
    if text.len() == 19 && is_iso_date(&text[..10]) && is_iso_time(&text[11..]) {
        let sep = text.as_bytes()[10];
        if sep == b' ' || sep == b't' || sep == b'T' {
            return Some(Form::Iso {
                date: &text[..10],
                time: Some(&text[11..]),
            });
        }
    }
    None
}

fn match_day_month_year(text: &str) -> Option<Form<'_>> {
    let parts: Vec<&str> = text.split(' ').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return None;
    }
    let day = parts[0];
    let (month, year) = parts[1].split_once('/')?;
    if !is_digits(day) || day.len() > 2 {
        return None;
    }
    if !is_alpha(month) || !is_digits(year) || (year.len() != 2 && year.len() != 4) {
        return None;
    }
    Some(Form::DayMonthYear {
        day,
        month,
        year,
        time: parts.get(2).copied(),
    })
}

fn match_day_month(text: &str) -> Option<Form<'_>> {
    let (day, month) = text.split_once(' ')?;
    if !is_digits(day) || day.len() > 2 {
        return None;
    }
    Some(Form::DayMonth {
        day: day.parse().ok()?,
        month: month_number(month)?,
    })
}

fn match_weekday_at(text: &str) -> Option<Form<'_>> {
    let (weekday, time) = text.split_once(' ')?;
    if is_alpha(weekday) && looks_like_time(time) {
        return Some(Form::WeekdayAt { weekday, time });
    }
    None
}

fn match_weekday(text: &str) -> Option<Form<'_>> {
    Some(Form::Weekday {
        weekday: weekday_index(text)?,
    })
}

fn match_amount(text: &str) -> Option<Form<'_>> {
    let (amount, unit) = text.split_once(' ')?;
    if is_digits(amount) && is_alpha(unit) {
        return Some(Form::Amount { amount, unit });
    }
    None
}

fn match_day_of_month(text: &str) -> Option<Form<'_>> {
    is_digits(text).then_some(Form::DayOfMonth { day: text })
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn is_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphabetic())
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && [0, 1, 2, 3, 5, 6, 8, 9].iter().all(|&i| b[i].is_ascii_digit())
}

fn is_iso_time(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 8
        && b[2] == b':'
        && b[5] == b':'
        && [0, 1, 3, 4, 6, 7].iter().all(|&i| b[i].is_ascii_digit())
}

fn looks_like_time(s: &str) -> bool {
    let digits = s
        .strip_suffix("am")
        .or_else(|| s.strip_suffix("pm"))
        .unwrap_or(s);
    is_digits(digits)
}

// --- RESOLUTION ---

fn resolve(
    form: &Form<'_>,
    now: NaiveDateTime,
    config: &ParserConfig,
) -> Result<NaiveDateTime, ParseFailure> {
    match *form {
        Form::Today => {
            let at_three = at_hour(now.date(), TODAY_HOUR);
            if at_three > now {
                Ok(at_three)
            } else {
                Ok(at_three + Duration::days(1))
            }
        }
        Form::Tomorrow => Ok(at_hour(now.date() + Duration::days(1), TOMORROW_HOUR)),
        Form::Next { unit } => {
            let canonical = normalize_unit(unit).ok_or_else(|| {
                ParseFailure::new(
                    ErrorKind::UnknownUnit,
                    format!("Unknown unit in 'next {}'", unit),
                )
            })?;
            offset(now, canonical, 1)
        }
        Form::Iso { date, time } => {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                ParseFailure::new(ErrorKind::InvalidDay, format!("Invalid date: {}", date))
            })?;
            let dt = match time {
                Some(t) => {
                    let time = NaiveTime::parse_from_str(t, "%H:%M:%S").map_err(|_| {
                        ParseFailure::new(ErrorKind::InvalidTime, format!("Invalid time: {}", t))
                    })?;
                    date.and_time(time)
                }
                None => at_hour(date, config.start_hour()),
            };
            require_future(dt, now)
        }
        Form::DayMonthYear {
            day,
            month,
            year,
            time,
        } => {
            let month_num = month_number(month).ok_or_else(|| {
                ParseFailure::new(ErrorKind::UnknownMonth, format!("Unknown month: {}", month))
            })?;
            let mut year_num: i32 = year.parse().map_err(|_| {
                ParseFailure::new(ErrorKind::InvalidDay, format!("Invalid year: {}", year))
            })?;
            if year.len() == 2 {
                year_num += 2000;
            }
            let hour = match time {
                Some(t) => parse_time_part(t).ok_or_else(|| {
                    ParseFailure::new(ErrorKind::InvalidTime, format!("Invalid time: {}", t))
                })?,
                None => config.start_hour(),
            };
            let date = day
                .parse::<u32>()
                .ok()
                .and_then(|d| NaiveDate::from_ymd_opt(year_num, month_num, d))
                .ok_or_else(|| {
                    ParseFailure::new(
                        ErrorKind::InvalidDay,
                        format!("Invalid date: {} {}/{}", day, month, year),
                    )
                })?;
            require_future(at_hour(date, hour), now)
        }
        Form::DayMonth { day, month } => {
            // Searching a few years ahead lets "29 feb" land on the next leap year.
            (0..=4)
                .filter_map(|ahead| NaiveDate::from_ymd_opt(now.year() + ahead, month, day))
                .map(|date| at_hour(date, config.start_hour()))
                .find(|candidate| *candidate > now)
                .ok_or_else(|| {
                    ParseFailure::new(
                        ErrorKind::InvalidDay,
                        format!("Invalid day {} for month {}", day, month),
                    )
                })
        }
        Form::WeekdayAt { weekday, time } => {
            let target = weekday_index(weekday).ok_or_else(|| {
                ParseFailure::new(
                    ErrorKind::UnknownWeekday,
                    format!("Unknown weekday: {}", weekday),
                )
            })?;
            let hour = parse_time_part(time).ok_or_else(|| {
                ParseFailure::new(ErrorKind::InvalidTime, format!("Invalid time: {}", time))
            })?;
            Ok(next_weekday(now, target, hour))
        }
        Form::Weekday { weekday } => Ok(next_weekday(now, weekday, config.start_hour())),
        Form::Amount { amount, unit } => {
            let amount: i64 = amount.parse().map_err(|_| {
                ParseFailure::new(ErrorKind::Unparseable, format!("Invalid number: {}", amount))
            })?;
            let canonical = normalize_unit(unit).ok_or_else(|| {
                ParseFailure::new(ErrorKind::UnknownUnit, format!("Unknown time unit: {}", unit))
            })?;
            offset(now, canonical, amount)
        }
        Form::DayOfMonth { day } => {
            let invalid = || {
                ParseFailure::new(
                    ErrorKind::InvalidDay,
                    format!("Invalid day of month: {}", day),
                )
            };
            let day_num: u32 = day.parse().map_err(|_| invalid())?;
            if !(1..=31).contains(&day_num) {
                return Err(invalid());
            }
            next_day_of_month(now, day_num, config.start_hour()).ok_or_else(invalid)
        }
    }
}

fn require_future(dt: NaiveDateTime, now: NaiveDateTime) -> Result<NaiveDateTime, ParseFailure> {
    if dt > now {
        Ok(dt)
    } else {
        Err(ParseFailure::new(
            ErrorKind::PastDate,
            format!(
                "Date {} is in the past",
                dt.format("%Y-%m-%d %H:%M:%S")
            ),
        ))
    }
}

fn offset(
    now: NaiveDateTime,
    unit: CanonicalUnit,
    amount: i64,
) -> Result<NaiveDateTime, ParseFailure> {
    unit.span(amount)
        .and_then(|span| now.checked_add_signed(span))
        .ok_or_else(|| {
            ParseFailure::new(
                ErrorKind::Unparseable,
                format!("{} {} is out of range", amount, unit),
            )
        })
}

fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN))
}

/// Parses an hour token: a bare `0`-`23`, or `1`-`12` followed by `am`/`pm`.
/// Returns the hour on a 24h clock.
pub fn parse_time_part(token: &str) -> Option<u32> {
    let lower = token.trim().to_lowercase();
    let (digits, is_pm) = if let Some(h) = lower.strip_suffix("am") {
        (h, Some(false))
    } else if let Some(h) = lower.strip_suffix("pm") {
        (h, Some(true))
    } else {
        (lower.as_str(), None)
    };
    if !is_digits(digits) {
        return None;
    }
    let hour: u32 = digits.parse().ok()?;

    match is_pm {
        None => (hour <= 23).then_some(hour),
        Some(_) if !(1..=12).contains(&hour) => None,
        Some(false) => Some(if hour == 12 { 0 } else { hour }),
        Some(true) => Some(if hour == 12 { 12 } else { hour + 12 }),
    }
}

/// Next occurrence of weekday `target` (Monday = 0) at `hour`, strictly after `now`.
/// Today counts only if `hour` has not passed yet.
pub fn next_weekday(now: NaiveDateTime, target: u32, hour: u32) -> NaiveDateTime {
    let current = now.weekday().num_days_from_monday();
    let days_ahead = (target % 7 + 7 - current) % 7;
    let today_at = at_hour(now.date(), hour);

    if days_ahead == 0 {
        if today_at > now {
            today_at
        } else {
            today_at + Duration::days(7)
        }
    } else {
        today_at + Duration::days(i64::from(days_ahead))
    }
}

/// Next calendar occurrence of day-of-month `day` at `hour`, strictly after `now`.
/// Looks at the current month and up to two following months (short months
/// are skipped).
pub fn next_day_of_month(now: NaiveDateTime, day: u32, hour: u32) -> Option<NaiveDateTime> {
    let (mut year, mut month) = (now.year(), now.month());
    for _ in 0..3 {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            let candidate = at_hour(date, hour);
            if candidate > now {
                return Some(candidate);
            }
        }
        (year, month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_part() {
        assert_eq!(parse_time_part("9"), Some(9));
        assert_eq!(parse_time_part("0"), Some(0));
        assert_eq!(parse_time_part("23"), Some(23));
        assert_eq!(parse_time_part("9AM"), Some(9));
        assert_eq!(parse_time_part("9pm"), Some(21));
        assert_eq!(parse_time_part("12AM"), Some(0));
        assert_eq!(parse_time_part("12PM"), Some(12));
        assert_eq!(parse_time_part("11pm"), Some(23));

        assert_eq!(parse_time_part("24"), None);
        assert_eq!(parse_time_part("13am"), None);
        assert_eq!(parse_time_part("0pm"), None);
        assert_eq!(parse_time_part("abc"), None);
        assert_eq!(parse_time_part("pm"), None);
        assert_eq!(parse_time_part("-1"), None);
    }

    #[test]
    fn test_rule_priority() {
        assert_eq!(matching_rule("today"), Some("today"));
        assert_eq!(matching_rule("next week"), Some("next-unit"));
        assert_eq!(matching_rule("2027-01-31"), Some("iso"));
        assert_eq!(matching_rule("2027-01-31T12:00:00"), Some("iso"));
        assert_eq!(matching_rule("25 Dec/27 9PM"), Some("day-month-year"));
        assert_eq!(matching_rule("25 aug"), Some("day-month"));
        assert_eq!(matching_rule("monday 9am"), Some("weekday-time"));
        assert_eq!(matching_rule("fri"), Some("weekday"));
        // "mon" is a weekday on its own, but a unit after a number
        assert_eq!(matching_rule("2 mon"), Some("amount-unit"));
        assert_eq!(matching_rule("2 hours repeat"), Some("amount-unit"));
        assert_eq!(matching_rule("25"), Some("day-of-month"));
        assert_eq!(matching_rule("whenever it suits"), None);
    }

    #[test]
    fn test_split_repeat() {
        assert_eq!(split_repeat("2 hours repeat"), ("2 hours", Some("2 hours")));
        assert_eq!(split_repeat("repeat"), ("repeat", None));
        assert_eq!(split_repeat("monday"), ("monday", None));
    }
}

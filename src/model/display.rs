// File: ./src/model/display.rs
// Human-readable rendering of trigger instants.
use chrono::{Datelike, NaiveDateTime};

/// Renders `instant` as a calendar phrase relative to `now`
/// ("Today at 03:00 PM", "Friday at 09:00 AM", "Jan 15, 2027 at 09:00 AM").
pub fn format_absolute(instant: NaiveDateTime, now: NaiveDateTime) -> String {
    let days_diff = (instant.date() - now.date()).num_days();

    if days_diff == 0 {
        instant.format("Today at %I:%M %p").to_string()
    } else if days_diff == 1 {
        instant.format("Tomorrow at %I:%M %p").to_string()
    } else if (2..=7).contains(&days_diff) {
        instant.format("%A at %I:%M %p").to_string()
    } else if instant.year() == now.year() {
        instant.format("%b %d at %I:%M %p").to_string()
    } else {
        instant.format("%b %d, %Y at %I:%M %p").to_string()
    }
}

/// Renders the time left until `instant` ("in 3 hours"), or "overdue".
/// Uses the largest unit that fits, truncating.
pub fn format_relative(instant: NaiveDateTime, now: NaiveDateTime) -> String {
    if instant <= now {
        return "overdue".to_string();
    }

    let total_seconds = (instant - now).num_seconds();
    let (amount, unit) = if total_seconds < 60 {
        (total_seconds, "second")
    } else if total_seconds < 3_600 {
        (total_seconds / 60, "minute")
    } else if total_seconds < 86_400 {
        (total_seconds / 3_600, "hour")
    } else if total_seconds < 604_800 {
        (total_seconds / 86_400, "day")
    } else {
        (total_seconds / 604_800, "week")
    };

    format!("in {} {}{}", amount, unit, if amount == 1 { "" } else { "s" })
}

/// Relative label with an ` (r)` marker for recurring reminders.
pub fn reminder_label(
    instant: NaiveDateTime,
    recurrence_descriptor: Option<&str>,
    now: NaiveDateTime,
) -> String {
    let label = format_relative(instant, now);
    if recurrence_descriptor.is_some() {
        format!("{} (r)", label)
    } else {
        label
    }
}

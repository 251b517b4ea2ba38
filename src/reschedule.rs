// File: ./src/reschedule.rs
// Computes the state change for a reminder that has just fired.
use crate::model::{ParseFailure, ParserConfig, ReminderPatch, TaskReminderState, parse_reminder};
use anyhow::Result;
use chrono::{Duration, NaiveDateTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RescheduleOutcome {
    /// Recurring reminder armed again.
    Rescheduled { next: NaiveDateTime },
    /// One-shot reminder consumed.
    Cleared,
    /// The recurrence descriptor no longer parses (a fixed date that has
    /// passed, or a corrupted descriptor); the reminder was disarmed.
    RecurrenceBroken(ParseFailure),
}

/// Decides what happens to a fired reminder.
///
/// Recurring reminders are re-resolved from their descriptor against `now`
/// (the moment of firing, not the previous trigger). One-shot reminders and
/// recurrences that no longer resolve lose their trigger and their text.
pub fn reschedule(
    state: &TaskReminderState,
    now: NaiveDateTime,
    config: &ParserConfig,
) -> (ReminderPatch, RescheduleOutcome) {
    let Some(descriptor) = state.recurrence_descriptor.as_deref() else {
        let patch = ReminderPatch {
            reminder_text: Some(None),
            trigger_instant: Some(None),
            recurrence_descriptor: None,
        };
        return (patch, RescheduleOutcome::Cleared);
    };

    match parse_reminder(descriptor, now, config) {
        Ok(resolved) => {
            let patch = ReminderPatch {
                trigger_instant: Some(Some(resolved.trigger_instant)),
                ..Default::default()
            };
            (
                patch,
                RescheduleOutcome::Rescheduled {
                    next: resolved.trigger_instant,
                },
            )
        }
        Err(failure) => {
            // Text goes too: left behind, the repair step would re-parse it
            // and fail again on every tick.
            let patch = ReminderPatch {
                reminder_text: Some(None),
                trigger_instant: Some(None),
                recurrence_descriptor: Some(None),
            };
            (patch, RescheduleOutcome::RecurrenceBroken(failure))
        }
    }
}

/// Pushes an armed reminder `minutes` into the future, keeping its recurrence.
pub fn snooze(state: &TaskReminderState, now: NaiveDateTime, minutes: u32) -> Result<ReminderPatch> {
    if state.trigger_instant.is_none() || state.status.is_terminal() {
        anyhow::bail!("No active reminder to delay");
    }
    if minutes == 0 {
        anyhow::bail!("Delay must be at least one minute");
    }
    let next = now + Duration::minutes(i64::from(minutes));

    Ok(ReminderPatch {
        reminder_text: Some(Some(format!("delayed: {} minutes", minutes))),
        trigger_instant: Some(Some(next)),
        recurrence_descriptor: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_snooze_keeps_recurrence() {
        let state = TaskReminderState {
            reminder_text: Some("monday 9am repeat".to_string()),
            trigger_instant: Some(now()),
            recurrence_descriptor: Some("monday 9am".to_string()),
            ..Default::default()
        };
        let patch = snooze(&state, now(), 10).unwrap();
        let mut after = state.clone();
        patch.apply_to(&mut after);

        assert_eq!(after.trigger_instant, Some(now() + Duration::minutes(10)));
        assert_eq!(after.reminder_text.as_deref(), Some("delayed: 10 minutes"));
        assert_eq!(after.recurrence_descriptor.as_deref(), Some("monday 9am"));
    }

    #[test]
    fn test_snooze_requires_active_trigger() {
        assert!(snooze(&TaskReminderState::default(), now(), 10).is_err());
    }
}

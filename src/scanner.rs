// File: ./src/scanner.rs
// Selects due reminders from a snapshot of task records.
//
// The scan itself is a pure filter. `repair_missing_triggers` is the
// maintenance step run right before it: tasks that carry reminder text but
// no resolved trigger (text written by a path that never parsed it) are
// re-resolved so they are not silently skipped.
use crate::model::{ParserConfig, ReminderPatch, TaskId, TaskRecord, parse_reminder};
use chrono::NaiveDateTime;

/// Identifiers of due tasks, in the order they were found in the snapshot.
pub type DueSet = Vec<TaskId>;

/// Returns the ids of all non-deleted, non-terminal tasks whose trigger
/// instant is at or before `now`.
pub fn scan(tasks: &[TaskRecord], now: NaiveDateTime) -> DueSet {
    tasks
        .iter()
        .filter(|task| !task.deleted && task.reminder.is_due(now))
        .map(|task| task.id)
        .collect()
}

/// Re-resolves tasks that have `reminder_text` but no `trigger_instant`.
///
/// Repaired records are updated in place and the matching patches are
/// returned so the caller can persist them. Text that no longer parses is
/// left untouched (and logged); the task simply stays un-armed.
pub fn repair_missing_triggers(
    tasks: &mut [TaskRecord],
    now: NaiveDateTime,
    config: &ParserConfig,
) -> Vec<(TaskId, ReminderPatch)> {
    let mut patches = Vec::new();

    for task in tasks.iter_mut() {
        if task.deleted || task.reminder.status.is_terminal() {
            continue;
        }
        if task.reminder.trigger_instant.is_some() {
            continue;
        }
        let Some(text) = task.reminder.reminder_text.as_deref() else {
            continue;
        };

        match parse_reminder(text, now, config) {
            Ok(resolved) => {
                log::info!(
                    "Repaired reminder for task {} ('{}'): next trigger {}",
                    task.id,
                    text,
                    resolved.trigger_instant
                );
                let mut patch = ReminderPatch {
                    trigger_instant: Some(Some(resolved.trigger_instant)),
                    ..Default::default()
                };
                if resolved.recurrence_descriptor.is_some() {
                    patch.recurrence_descriptor = Some(resolved.recurrence_descriptor);
                }
                patch.apply_to(&mut task.reminder);
                patches.push((task.id, patch));
            }
            Err(e) => {
                log::warn!(
                    "Task {} has reminder text '{}' that cannot be resolved: {}",
                    task.id,
                    text,
                    e
                );
            }
        }
    }

    patches
}

/// Number of tasks in the snapshot with an armed trigger.
pub fn count_armed(tasks: &[TaskRecord]) -> usize {
    tasks
        .iter()
        .filter(|t| !t.deleted && t.reminder.trigger_instant.is_some())
        .count()
}

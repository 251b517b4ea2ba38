// File: ./src/model/item.rs
use crate::model::parser::{ParseFailure, ParserConfig, parse_reminder};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TaskId = u64;

fn default_tag() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "new")]
    New,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
    #[serde(rename = "cancel", alias = "cancelled")]
    Cancelled,
    #[serde(rename = "post")]
    Postponed,
}

impl TaskStatus {
    /// Done and cancelled tasks never fire reminders.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancel",
            TaskStatus::Postponed => "post",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The reminder-related fields of a task.
///
/// `trigger_instant` is only ever set alongside `reminder_text`. The reverse does
/// not hold: text without a resolved instant is picked up by the repair step
/// before each scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReminderState {
    #[serde(default)]
    pub reminder_text: Option<String>,
    #[serde(default)]
    pub trigger_instant: Option<NaiveDateTime>,
    #[serde(default)]
    pub recurrence_descriptor: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl TaskReminderState {
    /// Parses `text` and arms the reminder. On failure nothing changes.
    pub fn set_reminder(
        &mut self,
        text: &str,
        now: NaiveDateTime,
        config: &ParserConfig,
    ) -> Result<(), ParseFailure> {
        let resolved = parse_reminder(text, now, config)?;
        self.reminder_text = Some(text.trim().to_string());
        self.trigger_instant = Some(resolved.trigger_instant);
        self.recurrence_descriptor = resolved.recurrence_descriptor;
        Ok(())
    }

    pub fn clear_reminder(&mut self) {
        self.reminder_text = None;
        self.trigger_instant = None;
        self.recurrence_descriptor = None;
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence_descriptor.is_some()
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        !self.status.is_terminal() && self.trigger_instant.is_some_and(|t| t <= now)
    }
}

/// A task as read from a store: its reminder state plus what a notification needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub created_on: Option<NaiveDateTime>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(flatten)]
    pub reminder: TaskReminderState,
}

impl TaskRecord {
    pub fn new(id: TaskId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            tag: default_tag(),
            notes: Vec::new(),
            created_on: None,
            deleted: false,
            reminder: TaskReminderState::default(),
        }
    }
}

/// A partial update of a task's reminder fields. `None` leaves a field as is;
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderPatch {
    pub reminder_text: Option<Option<String>>,
    pub trigger_instant: Option<Option<NaiveDateTime>>,
    pub recurrence_descriptor: Option<Option<String>>,
}

impl ReminderPatch {
    pub fn is_empty(&self) -> bool {
        self.reminder_text.is_none()
            && self.trigger_instant.is_none()
            && self.recurrence_descriptor.is_none()
    }

    pub fn apply_to(&self, state: &mut TaskReminderState) {
        if let Some(text) = &self.reminder_text {
            state.reminder_text = text.clone();
        }
        if let Some(trigger) = self.trigger_instant {
            state.trigger_instant = trigger;
        }
        if let Some(descriptor) = &self.recurrence_descriptor {
            state.recurrence_descriptor = descriptor.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in-progress\"");
        let parsed: TaskStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, TaskStatus::Cancelled);
        assert!(parsed.is_terminal());
        assert!(!TaskStatus::Postponed.is_terminal());
    }

    #[test]
    fn test_failed_set_keeps_previous_reminder() {
        let cfg = ParserConfig::default();
        let mut state = TaskReminderState::default();
        state.set_reminder("2 hours repeat", at(10, 0), &cfg).unwrap();
        let before = state.clone();

        let err = state.set_reminder("sometime soonish", at(10, 0), &cfg);
        assert!(err.is_err());
        assert_eq!(state, before);
        assert_eq!(state.recurrence_descriptor.as_deref(), Some("2 hours"));
        assert_eq!(state.trigger_instant, Some(at(12, 0)));
    }

    #[test]
    fn test_patch_apply() {
        let mut state = TaskReminderState {
            reminder_text: Some("tomorrow".to_string()),
            trigger_instant: Some(at(9, 0)),
            recurrence_descriptor: None,
            status: TaskStatus::New,
        };
        let patch = ReminderPatch {
            trigger_instant: Some(None),
            ..Default::default()
        };
        patch.apply_to(&mut state);
        assert_eq!(state.trigger_instant, None);
        assert_eq!(state.reminder_text.as_deref(), Some("tomorrow"));
        assert!(ReminderPatch::default().is_empty());
    }

    #[test]
    fn test_record_json_layout() {
        let json = r#"{"id": 7, "name": "Pay rent", "status": "post",
                       "trigger_instant": "2025-02-01T09:00:00", "reminder_text": "1 feb"}"#;
        let record: TaskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.tag, "default");
        assert_eq!(record.reminder.status, TaskStatus::Postponed);
        assert_eq!(record.reminder.reminder_text.as_deref(), Some("1 feb"));
        assert!(record.reminder.trigger_instant.is_some());
    }
}

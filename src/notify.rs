// File: ./src/notify.rs
// Notification payloads and the transports that deliver them.
use crate::model::TaskRecord;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use notify_rust::{Notification, Timeout};
use serde::Serialize;
use std::io::Write;
use std::process::{Command, Stdio};

pub const APP_NAME: &str = "DoList";
const NOTIFICATION_TIMEOUT_MS: u32 = 10_000;

/// What a transport receives for one due task.
///
/// Serialized as a flat JSON object when piped to an external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub id: u64,
    pub name: String,
    pub tag: String,
    pub status: String,
    pub reminder: Option<String>,
    pub notes: Vec<String>,
    pub created_on: Option<NaiveDateTime>,
    pub database: String,
}

impl NotificationPayload {
    pub fn from_task(task: &TaskRecord, database: &str) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            tag: task.tag.clone(),
            status: task.reminder.status.to_string(),
            reminder: task.reminder.reminder_text.clone(),
            notes: task.notes.clone(),
            created_on: task.created_on,
            database: database.to_string(),
        }
    }

    pub fn title(&self) -> String {
        format!("{}: {}", APP_NAME, self.name)
    }

    pub fn body(&self) -> String {
        let mut body = format!("Tag: {}\nStatus: {}", self.tag, self.status);
        if !self.notes.is_empty() {
            body.push_str(&format!("\n{} note(s) attached", self.notes.len()));
        }
        body
    }
}

/// A delivery mechanism. Blocking; success or failure is all the caller sees.
pub trait Notifier: Send + Sync {
    fn deliver(&self, payload: &NotificationPayload) -> Result<()>;

    fn describe(&self) -> String;
}

/// Local desktop notification.
#[derive(Debug, Default, Clone)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        let mut notification = Notification::new();
        notification
            .summary(&payload.title())
            .body(&payload.body())
            .appname(APP_NAME)
            .timeout(Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS));

        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(notify_rust::Urgency::Normal);

        notification
            .show()
            .map_err(|e| anyhow::anyhow!("Desktop notification failed: {}", e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        "desktop notifier".to_string()
    }
}

/// Runs a user-supplied command and writes the payload as JSON to its stdin.
/// The command line is split on whitespace; no shell is involved.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    pub command: String,
}

impl CommandNotifier {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.trim().to_string(),
        }
    }
}

impl Notifier for CommandNotifier {
    fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("reminder_cmd is empty"))?;

        let json = serde_json::to_string(payload)?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start reminder command '{}'", self.command))?;

        // Feed stdin from its own thread while wait_with_output drains stdout
        // and stderr; a command that ignores its input closes the pipe early.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || match stdin.write_all(json.as_bytes()) {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            })
        });

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for reminder command '{}'", self.command))?;

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Err(e)) => log::debug!("Writing payload to '{}' failed: {}", self.command, e),
                Err(_) => log::debug!("Payload writer for '{}' panicked", self.command),
                Ok(Ok(())) => {}
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Reminder command '{}' failed ({}): {}",
                self.command,
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("command '{}'", self.command)
    }
}

/// Picks the transport: an external command when one is configured, the
/// desktop notifier otherwise.
pub fn notifier_from_config(reminder_cmd: Option<&str>) -> Box<dyn Notifier> {
    match reminder_cmd.map(str::trim) {
        Some(cmd) if !cmd.is_empty() => Box::new(CommandNotifier::new(cmd)),
        _ => Box::new(DesktopNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;

    fn sample() -> TaskRecord {
        let mut task = TaskRecord::new(42, "Water plants");
        task.tag = "home".to_string();
        task.notes = vec!["balcony".to_string(), "kitchen".to_string()];
        task.reminder.status = TaskStatus::InProgress;
        task.reminder.reminder_text = Some("2 hours repeat".to_string());
        task
    }

    #[test]
    fn test_payload_text() {
        let payload = NotificationPayload::from_task(&sample(), "work");
        assert_eq!(payload.title(), "DoList: Water plants");
        assert_eq!(
            payload.body(),
            "Tag: home\nStatus: in-progress\n2 note(s) attached"
        );
    }

    #[test]
    fn test_payload_json() {
        let payload = NotificationPayload::from_task(&sample(), "work");
        let value: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["id"], 42);
        assert_eq!(value["status"], "in-progress");
        assert_eq!(value["database"], "work");
        assert_eq!(value["notes"].as_array().unwrap().len(), 2);
        assert!(value["created_on"].is_null());
    }

    #[test]
    fn test_notifier_selection() {
        assert_eq!(notifier_from_config(None).describe(), "desktop notifier");
        assert_eq!(notifier_from_config(Some("  ")).describe(), "desktop notifier");
        assert_eq!(
            notifier_from_config(Some("/usr/bin/my-hook")).describe(),
            "command '/usr/bin/my-hook'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_large_payload_judged_by_exit_status() {
        let mut task = sample();
        task.notes = (0..2_000).map(|i| format!("note {:04} {}", i, "x".repeat(64))).collect();
        let payload = NotificationPayload::from_task(&task, "default");
        assert!(serde_json::to_string(&payload).unwrap().len() > 64 * 1024);

        // Exits without reading stdin.
        assert!(CommandNotifier::new("true").deliver(&payload).is_ok());
        // Echoes everything back, larger than a pipe buffer.
        assert!(CommandNotifier::new("cat").deliver(&payload).is_ok());
        assert!(CommandNotifier::new("false").deliver(&payload).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_exit_status() {
        let payload = NotificationPayload::from_task(&sample(), "default");
        assert!(CommandNotifier::new("cat").deliver(&payload).is_ok());
        assert!(CommandNotifier::new("false").deliver(&payload).is_err());
        assert!(
            CommandNotifier::new("/nonexistent/dolist-hook")
                .deliver(&payload)
                .is_err()
        );
    }
}

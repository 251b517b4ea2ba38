// File: ./src/model/mod.rs
pub mod display;
pub mod item;
pub mod normalize;
pub mod parser;

pub use display::{format_absolute, format_relative, reminder_label};
pub use item::{ReminderPatch, TaskId, TaskRecord, TaskReminderState, TaskStatus};
pub use normalize::{CanonicalUnit, MONTH_NAMES, WEEKDAY_NAMES, normalize_unit};
pub use parser::{ErrorKind, ParseFailure, ParserConfig, ResolvedReminder, matching_rule, parse_reminder};

// File: ./src/system.rs
// The reminder service loop: repair, scan, dispatch, reschedule, persist.
use crate::model::{ParseFailure, ParserConfig, TaskId, TaskRecord};
use crate::notify::{NotificationPayload, Notifier};
use crate::reschedule::{RescheduleOutcome, reschedule};
use crate::scanner::{count_armed, repair_missing_triggers, scan};
use crate::store::ReminderStore;
use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Something that went wrong during a tick. Recorded and logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickFailure {
    Read {
        store: String,
        error: String,
    },
    Dispatch {
        store: String,
        id: TaskId,
        error: String,
    },
    Reschedule {
        store: String,
        id: TaskId,
        failure: ParseFailure,
    },
    Persist {
        store: String,
        id: TaskId,
        error: String,
    },
}

impl fmt::Display for TickFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickFailure::Read { store, error } => {
                write!(f, "[{}] could not read tasks: {}", store, error)
            }
            TickFailure::Dispatch { store, id, error } => {
                write!(f, "[{}] notification for task {} failed: {}", store, id, error)
            }
            TickFailure::Reschedule { store, id, failure } => write!(
                f,
                "[{}] recurrence of task {} no longer parses: {}",
                store, id, failure
            ),
            TickFailure::Persist { store, id, error } => {
                write!(f, "[{}] could not save task {}: {}", store, id, error)
            }
        }
    }
}

/// Per-store outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreReport {
    pub store: String,
    pub total: usize,
    pub armed: usize,
    pub repaired: Vec<TaskId>,
    pub due: Vec<TaskId>,
    pub dispatched: Vec<TaskId>,
    pub outcomes: Vec<(TaskId, RescheduleOutcome)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub cycle: u64,
    pub now: Option<NaiveDateTime>,
    pub stores: Vec<StoreReport>,
    pub failures: Vec<TickFailure>,
}

impl TickReport {
    pub fn due_count(&self) -> usize {
        self.stores.iter().map(|s| s.due.len()).sum()
    }
}

pub struct Scheduler {
    stores: Vec<Arc<dyn ReminderStore>>,
    notifier: Arc<dyn Notifier>,
    parser_config: ParserConfig,
    interval: Duration,
    verbose: bool,
    cycle: u64,
}

impl Scheduler {
    pub fn new(
        stores: Vec<Arc<dyn ReminderStore>>,
        notifier: Arc<dyn Notifier>,
        parser_config: ParserConfig,
        interval: Duration,
    ) -> Self {
        Self {
            stores,
            notifier,
            parser_config,
            interval: interval.max(Duration::from_secs(1)),
            verbose: false,
            cycle: 0,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Runs one full tick against `now`. Stores are processed in order; a
    /// failure in one task or store never stops the rest.
    pub fn run_tick(&mut self, now: NaiveDateTime) -> TickReport {
        self.cycle += 1;
        let mut report = TickReport {
            cycle: self.cycle,
            now: Some(now),
            ..Default::default()
        };

        log::debug!("Cycle #{} at {}", self.cycle, now.format("%Y-%m-%d %H:%M:%S"));

        for store in &self.stores {
            if let Some(store_report) = self.process_store(store.as_ref(), now, &mut report.failures)
            {
                report.stores.push(store_report);
            }
        }

        for failure in &report.failures {
            log::warn!("{}", failure);
        }
        if self.verbose && report.due_count() == 0 {
            log::info!("No due reminders this cycle");
        }
        report
    }

    fn process_store(
        &self,
        store: &dyn ReminderStore,
        now: NaiveDateTime,
        failures: &mut Vec<TickFailure>,
    ) -> Option<StoreReport> {
        let name = store.name().to_string();

        let mut tasks: Vec<TaskRecord> = match store.read_non_deleted() {
            Ok(tasks) => tasks,
            Err(e) => {
                failures.push(TickFailure::Read {
                    store: name,
                    error: format!("{:#}", e),
                });
                return None;
            }
        };

        let mut store_report = StoreReport {
            store: name.clone(),
            total: tasks.len(),
            ..Default::default()
        };

        for (id, patch) in repair_missing_triggers(&mut tasks, now, &self.parser_config) {
            match store.update(id, &patch) {
                Ok(()) => store_report.repaired.push(id),
                Err(e) => failures.push(TickFailure::Persist {
                    store: name.clone(),
                    id,
                    error: format!("{:#}", e),
                }),
            }
        }

        store_report.armed = count_armed(&tasks);
        store_report.due = scan(&tasks, now);

        if self.verbose {
            log::info!(
                "[{}] {} tasks, {} with reminders, {} due",
                name,
                store_report.total,
                store_report.armed,
                store_report.due.len()
            );
        } else if !store_report.due.is_empty() {
            log::info!("[{}] {} reminder(s) due", name, store_report.due.len());
        }

        for id in store_report.due.clone() {
            let Some(task) = tasks.iter().find(|t| t.id == id) else {
                continue;
            };

            let payload = NotificationPayload::from_task(task, &name);
            match self.notifier.deliver(&payload) {
                Ok(()) => {
                    log::info!("[{}] Reminder sent for task #{} '{}'", name, id, task.name);
                    store_report.dispatched.push(id);
                }
                Err(e) => failures.push(TickFailure::Dispatch {
                    store: name.clone(),
                    id,
                    error: format!("{:#}", e),
                }),
            }

            let (patch, outcome) = reschedule(&task.reminder, now, &self.parser_config);
            match &outcome {
                RescheduleOutcome::Rescheduled { next } => {
                    log::info!("[{}] Task #{} rescheduled for {}", name, id, next);
                }
                RescheduleOutcome::Cleared => {
                    log::info!("[{}] Task #{} reminder cleared", name, id);
                }
                RescheduleOutcome::RecurrenceBroken(failure) => {
                    failures.push(TickFailure::Reschedule {
                        store: name.clone(),
                        id,
                        failure: failure.clone(),
                    });
                }
            }

            if let Err(e) = store.update(id, &patch) {
                failures.push(TickFailure::Persist {
                    store: name.clone(),
                    id,
                    error: format!("{:#}", e),
                });
            }
            store_report.outcomes.push((id, outcome));
        }

        Some(store_report)
    }

    /// Ticks immediately, then once per interval, until `shutdown` flips to
    /// `true` or its sender is dropped. Each tick runs on the blocking pool.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let names = self
            .stores
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ");
        log::info!(
            "DoList reminder service started: {} store(s) [{}], checking every {}s via {}",
            self.stores.len(),
            names,
            self.interval.as_secs(),
            self.notifier.describe()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = Local::now().naive_local();
            let (scheduler, _report) = tokio::task::spawn_blocking(move || {
                let report = self.run_tick(now);
                (self, report)
            })
            .await?;
            self = scheduler;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        log::info!("DoList reminder service stopped after {} cycle(s)", self.cycle);
        Ok(())
    }
}

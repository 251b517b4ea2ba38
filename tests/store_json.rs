// End-to-end ticks against JSON task files on disk.
use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use dolist::config::Config;
use dolist::context::{AppContext, TestContext};
use dolist::model::{ParserConfig, TaskRecord};
use dolist::notify::{NotificationPayload, Notifier};
use dolist::store::{JsonTaskStore, ReminderStore};
use dolist::system::Scheduler;
use std::fs;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Collect(Mutex<Vec<u64>>);

impl Notifier for Collect {
    fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        self.0.lock().unwrap().push(payload.id);
        Ok(())
    }

    fn describe(&self) -> String {
        "collect".to_string()
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 15)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

#[test]
fn test_tick_persists_to_every_store() {
    let ctx = TestContext::new();
    let data = ctx.get_data_dir().unwrap();

    let mut work_task = TaskRecord::new(1, "Send report");
    work_task
        .reminder
        .set_reminder("2 hours repeat", now() - Duration::hours(3), &ParserConfig::default())
        .unwrap();
    let work = JsonTaskStore::new("work", data.join("work.json"));
    work.save_all(&[work_task]).unwrap();

    let mut home_task = TaskRecord::new(1, "Water plants");
    home_task.reminder.reminder_text = Some("tomorrow".to_string());
    let home = JsonTaskStore::new("home", data.join("home.json"));
    home.save_all(&[home_task]).unwrap();

    let notifier = Arc::new(Collect::default());
    let stores: Vec<Arc<dyn ReminderStore>> = vec![Arc::new(work.clone()), Arc::new(home.clone())];
    let mut scheduler = Scheduler::new(
        stores,
        notifier.clone(),
        ParserConfig::default(),
        std::time::Duration::from_secs(30),
    );

    let report = scheduler.run_tick(now());
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(*notifier.0.lock().unwrap(), vec![1]);

    let work_after = work.read_non_deleted().unwrap();
    assert_eq!(
        work_after[0].reminder.trigger_instant,
        Some(now() + Duration::hours(2))
    );
    assert_eq!(
        work_after[0].reminder.recurrence_descriptor.as_deref(),
        Some("2 hours")
    );

    let home_after = home.read_non_deleted().unwrap();
    assert_eq!(
        home_after[0].reminder.trigger_instant,
        Some(now().date().succ_opt().unwrap().and_hms_opt(9, 0, 0).unwrap())
    );
}

#[test]
fn test_unreadable_store_is_not_overwritten() {
    let ctx = TestContext::new();
    let path = ctx.get_data_dir().unwrap().join("tasks.json");
    fs::write(&path, "garbage").unwrap();

    let stores: Vec<Arc<dyn ReminderStore>> =
        vec![Arc::new(JsonTaskStore::new("default", path.clone()))];
    let mut scheduler = Scheduler::new(
        stores,
        Arc::new(Collect::default()),
        ParserConfig::default(),
        std::time::Duration::from_secs(30),
    );

    let report = scheduler.run_tick(now());
    assert_eq!(report.failures.len(), 1);
    assert!(report.stores.is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), "garbage");
}

#[test]
fn test_default_store_location() {
    let ctx = TestContext::new();
    let stores = Config::default().resolved_stores(&ctx).unwrap();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].path, ctx.get_data_dir().unwrap().join("tasks.json"));
}

//! Integration tests for the task reminder lifecycle.
//!
//! Drives `TaskNotificationOrchestrator` through create → update → disable →
//! delete against the in-memory scheduler and handle stores, checking what
//! gets registered, cancelled and persisted at every step.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use nudge::notify::recording::Trigger;
use nudge::notify::{HandleEntry, PeriodicPattern, PermissionState};
use nudge::recurrence::{
    Category, DescriptorError, EndOption, RecurrenceMode, ReminderOffset, TaskRecord,
};
use nudge::{
    EngineConfig, FixedClock, HandleStore, InMemoryHandleStore, JsonFileHandleStore, NudgeError,
    Plan, RecordingScheduler, ReminderState, TaskNotificationOrchestrator,
};
use std::sync::Arc;

fn at(m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

/// Wednesday 2025-01-01 08:00.
fn now() -> NaiveDateTime {
    at(1, 1, 8, 0)
}

struct Harness {
    scheduler: Arc<RecordingScheduler>,
    store: Arc<InMemoryHandleStore>,
    clock: Arc<FixedClock>,
    orchestrator: TaskNotificationOrchestrator,
}

fn harness_with(scheduler: RecordingScheduler) -> Harness {
    let scheduler = Arc::new(scheduler);
    let store = Arc::new(InMemoryHandleStore::new());
    let clock = Arc::new(FixedClock::new(now()));
    let orchestrator = TaskNotificationOrchestrator::new(
        scheduler.clone(),
        store.clone(),
        clock.clone(),
        EngineConfig::default(),
    );
    Harness {
        scheduler,
        store,
        clock,
        orchestrator,
    }
}

fn harness() -> Harness {
    harness_with(RecordingScheduler::new())
}

/// Daily reminders from 2025-01-02 20:00 up to the 2025-01-05 20:00 deadline.
fn essay() -> TaskRecord {
    let mut record = TaskRecord::new(1, "Essay", Category::Assignment, at(1, 5, 20, 0));
    record.reminder_enabled = true;
    record.reminder_offset = ReminderOffset::days(3);
    record.recurrence_mode = RecurrenceMode::Daily;
    record
}

/// Open-ended activity starting Friday 2025-01-03 18:30, reminded 30 minutes early.
fn swim(mode: RecurrenceMode) -> TaskRecord {
    let mut record = TaskRecord::new(2, "Swim", Category::Activity, at(1, 3, 18, 30));
    record.reminder_enabled = true;
    record.reminder_offset = ReminderOffset::minutes(30);
    record.recurrence_mode = mode;
    record
}

// ─── Creation ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_assignment_registers_and_persists() {
    let h = harness();
    let report = h.orchestrator.on_task_created(&essay()).await.unwrap();

    assert_eq!(report.state, ReminderState::Scheduled);
    assert_eq!(report.handles.len(), 4);
    assert_eq!(
        report.encoded,
        "v1:p=rec-0001;p=rec-0002;p=rec-0003;p=rec-0004"
    );
    assert!(report.persisted);
    assert_eq!(h.store.get(1).as_deref(), Some(report.encoded.as_str()));

    let fire_times: Vec<_> = h
        .scheduler
        .pending()
        .into_iter()
        .map(|r| r.trigger)
        .collect();
    assert_eq!(
        fire_times,
        vec![
            Trigger::At { at: at(1, 2, 20, 0) },
            Trigger::At { at: at(1, 3, 20, 0) },
            Trigger::At { at: at(1, 4, 20, 0) },
            Trigger::At { at: at(1, 5, 20, 0) },
        ]
    );
}

#[tokio::test]
async fn test_create_without_reminder_touches_nothing() {
    let h = harness();
    let mut record = essay();
    record.reminder_enabled = false;

    let report = h.orchestrator.on_task_created(&record).await.unwrap();
    assert_eq!(report.state, ReminderState::NoReminder);
    assert_eq!(h.scheduler.register_calls(), 0);
    assert_eq!(h.store.get(1), None);
}

#[tokio::test]
async fn test_assignment_with_past_anchor_schedules_nothing() {
    let h = harness();
    let mut record = essay();
    record.recurrence_mode = RecurrenceMode::None;
    record.deadline = at(1, 2, 9, 0);
    record.reminder_offset = ReminderOffset::days(2);

    let report = h.orchestrator.on_task_created(&record).await.unwrap();
    assert!(report.handles.is_empty());
    assert_eq!(report.encoded, "");
    assert!(!report.permission_denied);
    assert_eq!(h.scheduler.register_calls(), 0);
}

#[tokio::test]
async fn test_open_ended_monthly_registers_one_native_trigger() {
    let h = harness();
    let report = h
        .orchestrator
        .on_task_created(&swim(RecurrenceMode::Monthly))
        .await
        .unwrap();

    assert_eq!(report.handles.len(), 1);
    assert!(matches!(report.handles[0], HandleEntry::Single(_)));
    let pending = h.scheduler.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(
        pending[0].trigger,
        Trigger::Periodic {
            pattern: PeriodicPattern::Monthly {
                day: 3,
                hour: 18,
                minute: 0
            }
        }
    );
}

#[tokio::test]
async fn test_open_ended_weekly_is_stored_as_composite() {
    let h = harness();
    let mut record = swim(RecurrenceMode::Weekly);
    record.selected_weekdays = vec![1, 4];

    let report = h.orchestrator.on_task_created(&record).await.unwrap();
    assert_eq!(report.encoded, "v1:c=rec-0001,rec-0002");

    let weekdays: Vec<_> = h
        .scheduler
        .pending()
        .into_iter()
        .filter_map(|r| match r.trigger {
            Trigger::Periodic {
                pattern: PeriodicPattern::Weekly { weekday, .. },
            } => Some(weekday),
            _ => None,
        })
        .collect();
    assert_eq!(weekdays, vec![Weekday::Mon, Weekday::Thu]);
}

#[tokio::test]
async fn test_end_window_expands_instead_of_native() {
    let h = harness();
    let mut record = swim(RecurrenceMode::Daily);
    record.end_option = EndOption::AfterMonths;
    record.end_months = Some(1);

    let report = h.orchestrator.on_task_created(&record).await.unwrap();
    // 2025-01-03 .. 2025-01-31 at 18:00; the window closes 2025-02-01 08:00.
    assert_eq!(report.handles.len(), 29);
    assert!(
        h.scheduler
            .pending()
            .iter()
            .all(|r| matches!(r.trigger, Trigger::At { .. }))
    );
}

#[tokio::test]
async fn test_plan_for_registers_nothing() {
    let h = harness();
    let plan = h.orchestrator.plan_for(&essay()).unwrap();
    assert!(matches!(&plan, Plan::Expand(items) if items.len() == 4));
    assert_eq!(h.scheduler.register_calls(), 0);

    let mut disabled = essay();
    disabled.reminder_enabled = false;
    assert!(matches!(
        h.orchestrator.plan_for(&disabled),
        Err(NudgeError::InvalidReminder(DescriptorError::RemindersDisabled))
    ));
}

// ─── Updates ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_cancels_then_reschedules() {
    let h = harness();
    let previous = essay();
    h.orchestrator.on_task_created(&previous).await.unwrap();

    let mut current = previous.clone();
    current.deadline = at(1, 6, 20, 0);
    let report = h
        .orchestrator
        .on_task_updated(&previous, &current)
        .await
        .unwrap();

    assert_eq!(report.state, ReminderState::Rescheduled);
    assert_eq!(report.cancelled, 4);
    assert_eq!(
        report.encoded,
        "v1:p=rec-0005;p=rec-0006;p=rec-0007;p=rec-0008"
    );
    assert_eq!(h.store.get(1).as_deref(), Some(report.encoded.as_str()));

    let pending = h.scheduler.pending();
    assert_eq!(pending.len(), 4);
    assert_eq!(pending[0].trigger, Trigger::At { at: at(1, 3, 20, 0) });
    assert_eq!(pending[3].trigger, Trigger::At { at: at(1, 6, 20, 0) });
}

#[tokio::test]
async fn test_update_without_reminder_change_is_a_no_op() {
    let h = harness();
    let previous = essay();
    h.orchestrator.on_task_created(&previous).await.unwrap();
    let calls_before = h.scheduler.register_calls();

    let report = h
        .orchestrator
        .on_task_updated(&previous, &previous.clone())
        .await
        .unwrap();

    assert_eq!(report.state, ReminderState::Scheduled);
    assert_eq!(report.handles.len(), 4);
    assert_eq!(h.scheduler.register_calls(), calls_before);
    assert!(h.scheduler.cancel_calls().is_empty());
}

#[tokio::test]
async fn test_invalid_update_leaves_existing_registrations() {
    let h = harness();
    let previous = essay();
    let created = h.orchestrator.on_task_created(&previous).await.unwrap();

    let mut current = previous.clone();
    current.interval_count = 0;
    let err = h
        .orchestrator
        .on_task_updated(&previous, &current)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        NudgeError::InvalidReminder(DescriptorError::ZeroInterval)
    ));
    assert_eq!(h.scheduler.pending_count(), 4);
    assert!(h.scheduler.cancel_calls().is_empty());
    assert_eq!(h.store.get(1), Some(created.encoded));
}

#[tokio::test]
async fn test_disable_then_reenable() {
    let h = harness();
    let enabled = essay();
    h.orchestrator.on_task_created(&enabled).await.unwrap();

    let mut disabled = enabled.clone();
    disabled.reminder_enabled = false;
    let report = h
        .orchestrator
        .on_task_updated(&enabled, &disabled)
        .await
        .unwrap();
    assert_eq!(report.state, ReminderState::Cancelled);
    assert_eq!(report.cancelled, 4);
    assert_eq!(h.scheduler.pending_count(), 0);
    assert_eq!(h.store.get(1), None);

    // Two days later the reminder is switched back on; scheduling starts from the new "now".
    h.clock.advance_days(2);
    let report = h
        .orchestrator
        .on_task_updated(&disabled, &enabled)
        .await
        .unwrap();
    assert_eq!(report.state, ReminderState::Scheduled);
    assert_eq!(report.handles.len(), 3);
    assert_eq!(
        h.scheduler.pending()[0].trigger,
        Trigger::At { at: at(1, 3, 20, 0) }
    );
}

#[tokio::test]
async fn test_reminders_disabled_event_cancels() {
    let h = harness();
    h.orchestrator
        .on_task_created(&swim(RecurrenceMode::Monthly))
        .await
        .unwrap();

    let report = h.orchestrator.on_reminders_disabled(2).await;
    assert_eq!(report.state, ReminderState::Cancelled);
    assert_eq!(report.cancelled, 1);
    assert_eq!(h.scheduler.pending_count(), 0);
    assert_eq!(h.store.get(2), None);
}

// ─── Deletion ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_is_idempotent() {
    let h = harness();
    let mut record = swim(RecurrenceMode::Weekly);
    record.selected_weekdays = vec![1, 3, 5];
    h.orchestrator.on_task_created(&record).await.unwrap();
    assert_eq!(h.scheduler.pending_count(), 3);

    let first = h.orchestrator.on_task_deleted(2).await;
    assert_eq!(first.cancelled, 3);
    assert!(first.persisted);
    assert_eq!(h.scheduler.pending_count(), 0);

    let second = h.orchestrator.on_task_deleted(2).await;
    assert_eq!(second.state, ReminderState::Cancelled);
    assert_eq!(second.cancelled, 0);
}

#[tokio::test]
async fn test_delete_cancels_legacy_field() {
    let h = harness();
    h.orchestrator.on_task_created(&essay()).await.unwrap();
    h.store.insert(1, r#"["rec-0001,rec-0002", "rec-0003"]"#);

    let report = h.orchestrator.on_task_deleted(1).await;
    assert_eq!(report.cancelled, 3);
    assert_eq!(h.scheduler.pending_count(), 1);
}

// ─── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_permission_denied_is_reported_not_raised() {
    let h = harness_with(RecordingScheduler::with_permission(
        PermissionState::NotDetermined,
        PermissionState::Denied,
    ));

    let report = h.orchestrator.on_task_created(&essay()).await.unwrap();
    assert!(report.permission_denied);
    assert!(report.handles.is_empty());
    assert_eq!(report.encoded, "");
    assert_eq!(h.scheduler.permission_requests(), 1);
    assert_eq!(h.scheduler.register_calls(), 0);
}

#[tokio::test]
async fn test_refused_registration_is_skipped() {
    let scheduler = RecordingScheduler::new();
    scheduler.reject_registration_at(at(1, 3, 20, 0));
    let h = harness_with(scheduler);

    let report = h.orchestrator.on_task_created(&essay()).await.unwrap();
    assert_eq!(report.handles.len(), 3);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn test_store_failure_is_reported() {
    let h = harness();
    h.store.set_fail_saves(true);

    let report = h.orchestrator.on_task_created(&essay()).await.unwrap();
    assert!(!report.persisted);
    assert_eq!(report.handles.len(), 4);
}

// ─── File-backed store ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_json_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handles.json");
    let scheduler = Arc::new(RecordingScheduler::new());
    let clock = Arc::new(FixedClock::new(now()));

    let first = TaskNotificationOrchestrator::new(
        scheduler.clone(),
        Arc::new(JsonFileHandleStore::new(&path)),
        clock.clone(),
        EngineConfig::default(),
    );
    first.on_task_created(&essay()).await.unwrap();
    drop(first);

    let store = Arc::new(JsonFileHandleStore::new(&path));
    assert_eq!(
        store.load(1).await.unwrap(),
        "v1:p=rec-0001;p=rec-0002;p=rec-0003;p=rec-0004"
    );

    let second =
        TaskNotificationOrchestrator::new(scheduler.clone(), store, clock, EngineConfig::default());
    let report = second.on_task_deleted(1).await;
    assert_eq!(report.cancelled, 4);
    assert_eq!(scheduler.pending_count(), 0);
}

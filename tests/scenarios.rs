//! End-to-end reconcile scenarios (black-box, through `sync_cron_job` only).
//!
//! Covers the same scenario table a Kubernetes-style CronJob controller
//! is validated against: same schedule, same creation timestamp, same
//! named ticks (S1 through S8). Unit tests inside `decision`/`reconciler` already
//! cover the same ground at a finer grain; these drive the whole crate
//! through its public surface the way an external caller would.

use chrono::{DateTime, TimeZone, Utc};
use cronctl::interfaces::fakes::{FakeCronJobControl, FakeEventRecorder, FakeJobControl};
use cronctl::model::{ConcurrencyPolicy, CronJob, CronJobSpec, CronJobStatus, Job, JobCondition, JobConditionType, JobTemplateSpec, JobsHistoryLimits, ObjectRef, OwnerRef};
use cronctl::{sync_cron_job, ReconcilerConfig};
use uuid::Uuid;

fn t(h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 5, 19, h, mi, s).unwrap()
}

fn fresh_cron_job() -> CronJob {
    CronJob {
        object_ref: ObjectRef::new("default", "backup", Uuid::from_bytes([0x42; 16])),
        creation_timestamp: t(9, 59, 0),
        spec: CronJobSpec {
            schedule: "0 * * * *".to_string(),
            time_zone: None,
            concurrency_policy: ConcurrencyPolicy::Allow,
            suspend: false,
            starting_deadline_seconds: None,
            job_template: JobTemplateSpec::default(),
            jobs_history_limits: JobsHistoryLimits::default(),
        },
        status: CronJobStatus::default(),
    }
}

fn active_child(cj: &CronJob, created_at: DateTime<Utc>) -> Job {
    Job {
        object_ref: ObjectRef::new("default", "backup-1", Uuid::from_bytes([0x43; 16])),
        owner_refs: vec![OwnerRef::for_cron_job(&cj.object_ref)],
        creation_timestamp: created_at,
        completion_time: None,
        conditions: vec![],
        labels: Default::default(),
        annotations: Default::default(),
        payload: serde_json::Value::Null,
    }
}

fn completed_child(cj: &CronJob, created_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Job {
    Job {
        object_ref: ObjectRef::new("default", "backup-0", Uuid::from_bytes([0x44; 16])),
        owner_refs: vec![OwnerRef::for_cron_job(&cj.object_ref)],
        creation_timestamp: created_at,
        completion_time: Some(completed_at),
        conditions: vec![JobCondition {
            condition_type: JobConditionType::Complete,
            status: true,
        }],
        labels: Default::default(),
        annotations: Default::default(),
        payload: serde_json::Value::Null,
    }
}

struct Harness {
    job_control: FakeJobControl,
    cronjob_control: FakeCronJobControl,
    events: FakeEventRecorder,
    config: ReconcilerConfig,
}

impl Harness {
    fn new() -> Self {
        Self {
            job_control: FakeJobControl::new(),
            cronjob_control: FakeCronJobControl::new(),
            events: FakeEventRecorder::new(),
            config: ReconcilerConfig::default(),
        }
    }
}

#[test]
fn s1_never_ran_not_yet_due() {
    let cj = fresh_cron_job();
    let h = Harness::new();

    let result = sync_cron_job(&cj, &[], t(9, 59, 0), &h.config, &h.job_control, &h.cronjob_control, &h.events).unwrap();

    assert!(h.job_control.is_empty());
    assert_eq!(result.cron_job.status.active.len(), 0);
    let requeue = result.requeue_after.expect("a due-soon CronJob must requeue");
    assert!(requeue.num_seconds() > 0 && requeue.num_seconds() <= 70, "expected ~60s, got {requeue:?}");
}

#[test]
fn s2_never_ran_due_now() {
    let cj = fresh_cron_job();
    let h = Harness::new();

    let result = sync_cron_job(&cj, &[], t(10, 1, 0), &h.config, &h.job_control, &h.cronjob_control, &h.events).unwrap();

    assert_eq!(h.job_control.len(), 1);
    assert_eq!(result.cron_job.status.active.len(), 1);
    let requeue = result.requeue_after.expect("must requeue toward the next hour");
    assert!(requeue.num_minutes() >= 58 && requeue.num_minutes() <= 59, "expected ~59m, got {requeue:?}");
}

#[test]
fn s3_starting_deadline_exceeded_skips_the_miss() {
    let mut cj = fresh_cron_job();
    cj.spec.starting_deadline_seconds = Some(10);
    let h = Harness::new();

    let result = sync_cron_job(&cj, &[], t(10, 1, 11), &h.config, &h.job_control, &h.cronjob_control, &h.events).unwrap();

    assert!(h.job_control.is_empty());
    let requeue = result.requeue_after.expect("must still requeue toward the next hour");
    assert!(requeue.num_minutes() >= 58, "expected requeue past the hour, got {requeue:?}");
}

#[test]
fn s4_prior_completion_sets_last_successful_time_and_still_creates() {
    let cj = fresh_cron_job();
    let completion = t(9, 30, 0);
    let finished = completed_child(&cj, t(9, 0, 0), completion);
    let h = Harness::new();

    let result = sync_cron_job(&cj, &[finished], t(10, 1, 0), &h.config, &h.job_control, &h.cronjob_control, &h.events).unwrap();

    assert_eq!(h.job_control.len(), 1, "a due tick still creates the next run");
    assert_eq!(result.cron_job.status.last_successful_time, Some(completion));
}

#[test]
fn s5_forbid_with_active_child_skips_create_and_warns() {
    let mut cj = fresh_cron_job();
    cj.spec.concurrency_policy = ConcurrencyPolicy::Forbid;
    let active = active_child(&cj, t(9, 0, 0));
    cj.status.active = vec![active.object_ref.clone()];
    let h = Harness::new();
    h.job_control.seed(active.clone());

    let result = sync_cron_job(&cj, &[active], t(10, 1, 0), &h.config, &h.job_control, &h.cronjob_control, &h.events).unwrap();

    assert_eq!(h.job_control.len(), 1, "no second Job created");
    assert_eq!(result.cron_job.status.active.len(), 1);
    assert!(h.events.warnings().iter().any(|(reason, _)| reason == "JobAlreadyActive"));
}

#[test]
fn s6_replace_with_active_child_deletes_then_creates() {
    let mut cj = fresh_cron_job();
    cj.spec.concurrency_policy = ConcurrencyPolicy::Replace;
    let active = active_child(&cj, t(9, 0, 0));
    cj.status.active = vec![active.object_ref.clone()];
    let h = Harness::new();
    h.job_control.seed(active.clone());

    let result = sync_cron_job(&cj, &[active.clone()], t(10, 1, 0), &h.config, &h.job_control, &h.cronjob_control, &h.events).unwrap();

    assert_eq!(result.cron_job.status.active.len(), 1);
    assert!(!h.job_control.contains("default", &active.object_ref.name), "the old child was deleted");
    assert_eq!(h.events.normal().iter().filter(|(r, _)| r == "SuccessfulDelete").count(), 1);
    assert_eq!(h.events.normal().iter().filter(|(r, _)| r == "SuccessfulCreate").count(), 1);
}

#[test]
fn s7_week_stale_creates_once_and_warns_too_many_missed() {
    let cj = fresh_cron_job();
    let h = Harness::new();
    let week_later = Utc.with_ymd_and_hms(2016, 5, 26, 10, 0, 0).unwrap();

    let result = sync_cron_job(&cj, &[], week_later, &h.config, &h.job_control, &h.cronjob_control, &h.events).unwrap();

    assert_eq!(h.job_control.len(), 1, "only one Job created despite many missed ticks");
    assert!(h.events.warnings().iter().any(|(reason, _)| reason == "TooManyMissedTimes"));
}

#[test]
fn s8_clock_skew_already_exists_is_not_a_new_create() {
    let mut cj = fresh_cron_job();
    cj.spec.concurrency_policy = ConcurrencyPolicy::Forbid;
    // The lister already observed the Job this tick would have created, at
    // an instant slightly ahead of `now` (the clock/lister skew).
    let already_running = active_child(&cj, t(10, 1, 0));
    cj.status.active = vec![already_running.object_ref.clone()];
    let h = Harness::new();
    h.job_control.seed(already_running.clone());

    let result = sync_cron_job(&cj, &[already_running], t(9, 59, 0), &h.config, &h.job_control, &h.cronjob_control, &h.events).unwrap();

    assert_eq!(h.job_control.len(), 1, "no new Job created under the skew");
    assert!(result.status_changed || result.requeue_after.is_some(), "a status update or requeue must still happen");
}

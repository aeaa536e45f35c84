//! The core reconcile state transition. Pure function of `(CronJob,
//! ChildJobIndex, now)` — no I/O, no clock calls of its own.
//! `reconciler::sync_cron_job` executes the plan this produces.

use chrono::{DateTime, Duration, Utc};

use crate::child_index::ChildJobIndex;
use crate::missed_starts;
use crate::model::{ConcurrencyPolicy, CronJob, Job, JobTemplateSpec, ObjectRef, OwnerRef};
use crate::schedule::ParsedSchedule;
use crate::time_math::{self, requeue_after};

/// A warning or normal event the caller should emit via `EventRecorder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub warning: bool,
    pub reason: &'static str,
    pub message: String,
}

impl Notice {
    fn warn(reason: &'static str, message: impl Into<String>) -> Self {
        Self {
            warning: true,
            reason,
            message: message.into(),
        }
    }
}

/// Which branch of the reconcile state machine fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Rule 1: `Spec.Schedule` does not parse. No create, no delete, no
    /// requeue, no status write at all.
    Unparseable,
    /// Rule 5: no scheduled time <= now.
    NothingDue,
    /// Rule 6: a due tick fell outside `StartingDeadlineSeconds`. The
    /// miss is not consumed — `LastScheduleTime` is left untouched.
    ///
    /// Structurally unreachable as long as `missed_starts::enumerate`
    /// narrows its scan window to `now - deadline` before looking for a
    /// miss (`time_math::earliest_time`): any `scheduled_time` it can
    /// still find already satisfies `now - scheduled_time <= deadline`.
    /// A too-late single miss instead falls out the window entirely and
    /// surfaces as `NothingDue`. Kept for rule-cascade completeness.
    DeadlineExceeded,
    /// Rule 7: `Spec.Suspend == true`. `LastScheduleTime` still advances.
    Suspended { scheduled_time: DateTime<Utc> },
    /// Rule 8, `Forbid`: an active child blocks this tick.
    Forbidden { scheduled_time: DateTime<Utc> },
    /// Rule 8, `Replace`: a victim reference could not be resolved to an
    /// observed Job, so creation does not proceed this tick.
    ReplaceUnresolved,
    /// Rules 8-11: proceed to create (after any `Replace` deletes).
    Create { scheduled_time: DateTime<Utc> },
}

/// The full output of `decide`: everything `reconciler::sync_cron_job`
/// needs to execute effects and write status, with no further decisions
/// left to make.
#[derive(Debug, Clone)]
pub struct Plan {
    pub action: Action,
    /// The reconciled active list, with `Replace` victims already
    /// removed, before any new Job is appended post-create.
    pub active: Vec<ObjectRef>,
    /// Resolved `Replace` victims to delete, in order.
    pub deletes: Vec<ObjectRef>,
    /// `mostRecentCompletion`, carried through if newer than the
    /// CronJob's current `LastSuccessfulTime` (rule 2).
    pub last_successful_time: Option<DateTime<Utc>>,
    pub requeue_after: Option<Duration>,
    pub notices: Vec<Notice>,
}

impl Plan {
    /// Whether the active-list / completion-time reconciliation alone
    /// (rules 2-3) changed anything, independent of create/delete.
    pub fn base_status_changed(&self, original: &CronJob) -> bool {
        !same_ref_set(&self.active, &original.status.active)
            || self.last_successful_time.is_some_and(|t| Some(t) != original.status.last_successful_time)
    }
}

fn same_ref_set(a: &[ObjectRef], b: &[ObjectRef]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|r| b.iter().any(|o| o.uid == r.uid))
}

/// Decide what should happen this tick, walking the rule cascade top to
/// bottom and returning as soon as one rule fires.
pub fn decide(cron_job: &CronJob, index: &ChildJobIndex, observed: &[Job], now: DateTime<Utc>) -> Plan {
    let schedule = match ParsedSchedule::parse_in(&cron_job.spec.schedule, cron_job.spec.time_zone.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            return Plan {
                action: Action::Unparseable,
                active: cron_job.status.active.clone(),
                deletes: vec![],
                last_successful_time: cron_job.status.last_successful_time,
                requeue_after: None,
                notices: vec![Notice::warn("UnparseableSchedule", e.to_string())],
            };
        }
    };

    // Rule 2: refresh completion time regardless of everything else below.
    let last_successful_time = match (index.most_recent_completion, cron_job.status.last_successful_time) {
        (Some(completion), Some(current)) if completion > current => Some(completion),
        (Some(completion), None) => Some(completion),
        _ => cron_job.status.last_successful_time,
    };

    // Rule 3: reconcile the active list.
    let active = index.active.clone();

    let deadline = cron_job.spec.starting_deadline_seconds.map(Duration::seconds);

    // Rule 4: compute the scheduled time.
    let missed = missed_starts::enumerate(
        &schedule,
        cron_job.status.last_schedule_time,
        cron_job.creation_timestamp,
        now,
        deadline,
    );
    let mut notices = Vec::new();
    if missed.too_many {
        notices.push(Notice::warn(
            "TooManyMissedTimes",
            format!(
                "cannot determine if job needs to be started: too many missed start times ({}); set or decrease .spec.startingDeadlineSeconds or check clock skew",
                missed.missed_count
            ),
        ));
    }

    let Some(scheduled_time) = missed.scheduled_time else {
        // Rule 5: nothing due.
        return Plan {
            action: Action::NothingDue,
            active,
            deletes: vec![],
            last_successful_time,
            requeue_after: requeue_after(&schedule, now),
            notices,
        };
    };

    // Rule 6: deadline exceeded — the miss is not consumed.
    if time_math::deadline_exceeded(scheduled_time, now, deadline) {
        return Plan {
            action: Action::DeadlineExceeded,
            active,
            deletes: vec![],
            last_successful_time,
            requeue_after: requeue_after(&schedule, now),
            notices,
        };
    }

    // Rule 7: suspended.
    if cron_job.spec.suspend {
        return Plan {
            action: Action::Suspended { scheduled_time },
            active,
            deletes: vec![],
            last_successful_time,
            requeue_after: requeue_after(&schedule, now),
            notices,
        };
    }

    // Rule 8: concurrency policy gate.
    match cron_job.spec.concurrency_policy {
        ConcurrencyPolicy::Allow => Plan {
            action: Action::Create { scheduled_time },
            active,
            deletes: vec![],
            last_successful_time,
            requeue_after: requeue_after(&schedule, now),
            notices,
        },
        ConcurrencyPolicy::Forbid => {
            if !active.is_empty() {
                notices.push(Notice::warn("JobAlreadyActive", "Not starting job because prior execution is still running"));
                Plan {
                    action: Action::Forbidden { scheduled_time },
                    active,
                    deletes: vec![],
                    last_successful_time,
                    requeue_after: requeue_after(&schedule, now),
                    notices,
                }
            } else {
                Plan {
                    action: Action::Create { scheduled_time },
                    active,
                    deletes: vec![],
                    last_successful_time,
                    requeue_after: requeue_after(&schedule, now),
                    notices,
                }
            }
        }
        ConcurrencyPolicy::Replace => {
            // Every currently-active ref must resolve to an observed,
            // non-terminal Job to be a valid delete target. If any
            // cannot be resolved (lister-stale), treat as a get-error
            // path: warning, no create.
            let mut victims = Vec::new();
            for r in &active {
                match observed.iter().find(|j| j.object_ref.uid == r.uid) {
                    Some(job) if !job.is_finished() => victims.push(r.clone()),
                    Some(_) => {} // already terminal; nothing to delete
                    None => {
                        notices.push(Notice::warn(
                            "FailedGet",
                            format!("cannot resolve active job {} to delete for Replace policy", r.name),
                        ));
                        return Plan {
                            action: Action::ReplaceUnresolved,
                            active,
                            deletes: vec![],
                            last_successful_time,
                            requeue_after: requeue_after(&schedule, now),
                            notices,
                        };
                    }
                }
            }
            let remaining: Vec<ObjectRef> = active.iter().filter(|r| !victims.iter().any(|v| v.uid == r.uid)).cloned().collect();
            Plan {
                action: Action::Create { scheduled_time },
                active: remaining,
                deletes: victims,
                last_successful_time,
                requeue_after: requeue_after(&schedule, now),
                notices,
            }
        }
    }
}

/// Materialise a Job from the CronJob's template for `scheduled_time`.
/// Name is deterministic so a repeated create for the same scheduled
/// time is idempotent at the API layer.
pub fn materialise_job(cron_job: &CronJob, scheduled_time: DateTime<Utc>) -> Job {
    let name = format!("{}-{}", cron_job.object_ref.name, scheduled_time.timestamp());
    let mut template = cron_job.spec.job_template.clone();
    stamp_template_metadata(&mut template, cron_job);
    Job {
        object_ref: ObjectRef::new(cron_job.object_ref.namespace.clone(), name, uuid::Uuid::new_v4()),
        owner_refs: vec![OwnerRef::for_cron_job(&cron_job.object_ref)],
        creation_timestamp: scheduled_time,
        completion_time: None,
        conditions: vec![],
        labels: template.labels,
        annotations: template.annotations,
        payload: template.payload,
    }
}

fn stamp_template_metadata(template: &mut JobTemplateSpec, cron_job: &CronJob) {
    template.labels.insert("cronjob-name".to_string(), cron_job.object_ref.name.clone());
}

//! The single entry point an external workqueue-driven caller invokes per
//! tick: `sync_cron_job`. Ties `child_index`, `decision`, `status`, and
//! `effects` together in the order a reconcile tick requires, and is the
//! only place in the crate that performs I/O against the injected traits.

use chrono::{DateTime, Duration, Utc};

use crate::child_index;
use crate::decision::{self, Action};
use crate::effects;
use crate::error::ReconcileError;
use crate::interfaces::{CronJobControl, EventRecorder, EventType, JobControl};
use crate::model::{CronJob, Job};
use crate::status::StatusDelta;

/// Tunables for the reconciler that aren't part of any single CronJob's
/// own configuration, carried as an ambient configuration layer above it.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Fallback `StartingDeadlineSeconds` applied when a CronJob's own
    /// configuration leaves it unset and the operator wants a
    /// cluster-wide bound anyway. `None` preserves the "unbounded" default.
    pub default_starting_deadline_seconds: Option<i64>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            default_starting_deadline_seconds: None,
        }
    }
}

/// Result of one `sync_cron_job` invocation.
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// A fresh copy of the CronJob reflecting any status change. Equal
    /// to the input by value when nothing changed, but always a
    /// distinct allocation.
    pub cron_job: CronJob,
    pub status_changed: bool,
    pub requeue_after: Option<Duration>,
}

/// Run one reconcile tick.
///
/// `cron_job` and `observed_jobs` are read-only; the function never
/// mutates them. Effects (create/delete/status-update/events) are issued
/// in the order deletes -> create -> status-update.
pub fn sync_cron_job<J, C, E>(
    cron_job: &CronJob,
    observed_jobs: &[Job],
    now: DateTime<Utc>,
    config: &ReconcilerConfig,
    job_control: &J,
    cronjob_control: &C,
    events: &E,
) -> Result<SyncResult, ReconcileError>
where
    J: JobControl,
    C: CronJobControl,
    E: EventRecorder,
{
    let mut effective_cron_job = cron_job.clone();
    if effective_cron_job.spec.starting_deadline_seconds.is_none() {
        effective_cron_job.spec.starting_deadline_seconds = config.default_starting_deadline_seconds;
    }

    let index = child_index::build(&effective_cron_job, observed_jobs);
    let plan = decision::decide(&effective_cron_job, &index, observed_jobs, now);

    effects::emit_notices(events, &cron_job.object_ref, &plan.notices);

    if matches!(plan.action, Action::Unparseable) {
        // Rule 1: zero status writes, zero requeue.
        return Ok(SyncResult {
            cron_job: cron_job.clone(),
            status_changed: false,
            requeue_after: None,
        });
    }

    let base_delta = StatusDelta {
        active: Some(plan.active.clone()),
        last_schedule_time: None,
        last_successful_time: plan.last_successful_time,
    };

    match plan.action {
        Action::Unparseable => unreachable!("handled above"),
        Action::NothingDue | Action::DeadlineExceeded | Action::ReplaceUnresolved => {
            let updated = effects::update_status_if_changed(cronjob_control, cron_job, &base_delta)
                .map_err(|e| ReconcileError::StatusUpdateFailed {
                    cron_job: cron_job.object_ref.name.clone(),
                    source: e,
                })?;
            let status_changed = updated.is_some();
            Ok(SyncResult {
                cron_job: updated.unwrap_or_else(|| cron_job.clone()),
                status_changed,
                requeue_after: plan.requeue_after,
            })
        }
        Action::Suspended { scheduled_time } | Action::Forbidden { scheduled_time } => {
            let delta = StatusDelta {
                last_schedule_time: Some(scheduled_time),
                ..base_delta
            };
            let updated = effects::update_status_if_changed(cronjob_control, cron_job, &delta)
                .map_err(|e| ReconcileError::StatusUpdateFailed {
                    cron_job: cron_job.object_ref.name.clone(),
                    source: e,
                })?;
            let status_changed = updated.is_some();
            Ok(SyncResult {
                cron_job: updated.unwrap_or_else(|| cron_job.clone()),
                status_changed,
                requeue_after: plan.requeue_after,
            })
        }
        Action::Create { scheduled_time } => {
            // Deletes first (Replace victims), best-effort.
            effects::execute_deletes(job_control, events, &cron_job.object_ref, &plan.deletes);

            let job = decision::materialise_job(&effective_cron_job, scheduled_time);
            let outcome = effects::execute_create(job_control, events, &cron_job.object_ref, job);

            let (delta, hard_error): (StatusDelta, Option<ReconcileError>) = match outcome {
                effects::CreateOutcome::Created(created) => {
                    let mut active = plan.active.clone();
                    active.push(created.object_ref.clone());
                    (
                        StatusDelta {
                            active: Some(active),
                            last_schedule_time: Some(scheduled_time),
                            last_successful_time: plan.last_successful_time,
                        },
                        None,
                    )
                }
                effects::CreateOutcome::AlreadyExists => (
                    StatusDelta {
                        active: Some(plan.active.clone()),
                        last_schedule_time: Some(scheduled_time),
                        last_successful_time: plan.last_successful_time,
                    },
                    None,
                ),
                effects::CreateOutcome::Failed(api_err) => (
                    // LastScheduleTime is not advanced on a hard create
                    // failure; the active-list and completion-time
                    // reconciliation still apply so the deletes above
                    // aren't lost.
                    StatusDelta {
                        active: Some(plan.active.clone()),
                        last_schedule_time: None,
                        last_successful_time: plan.last_successful_time,
                    },
                    Some(ReconcileError::CreateFailed {
                        cron_job: cron_job.object_ref.name.clone(),
                        source: api_err,
                    }),
                ),
            };

            let updated = effects::update_status_if_changed(cronjob_control, cron_job, &delta).map_err(|e| ReconcileError::StatusUpdateFailed {
                cron_job: cron_job.object_ref.name.clone(),
                source: e,
            })?;
            let status_changed = updated.is_some();
            let result = SyncResult {
                cron_job: updated.unwrap_or_else(|| cron_job.clone()),
                status_changed,
                requeue_after: plan.requeue_after,
            };
            match hard_error {
                Some(err) => Err(err),
                None => Ok(result),
            }
        }
    }
}

/// Force-trigger a Job for `cron_job` right now, bypassing the schedule
/// check but never the concurrency gate. Equivalent to a `sync_cron_job`
/// tick where the current instant happens to be exactly on schedule.
pub fn trigger_now<J, E>(
    cron_job: &CronJob,
    observed_jobs: &[Job],
    now: DateTime<Utc>,
    job_control: &J,
    events: &E,
) -> Result<Job, ReconcileError>
where
    J: JobControl,
    E: EventRecorder,
{
    let index = child_index::build(cron_job, observed_jobs);
    if cron_job.spec.concurrency_policy == crate::model::ConcurrencyPolicy::Forbid && !index.active.is_empty() {
        events.event(
            &cron_job.object_ref,
            EventType::Warning,
            "JobAlreadyActive",
            "Not starting job because prior execution is still running",
        );
        return Err(ReconcileError::CreateFailed {
            cron_job: cron_job.object_ref.name.clone(),
            source: crate::error::ApiError::Transient("forbidden by concurrency policy".to_string()),
        });
    }
    let job = decision::materialise_job(cron_job, now);
    let job_name = job.object_ref.name.clone();
    match effects::execute_create(job_control, events, &cron_job.object_ref, job) {
        effects::CreateOutcome::Created(created) => Ok(created),
        effects::CreateOutcome::AlreadyExists => job_control.get_job(&cron_job.object_ref.namespace, &job_name).map_err(|e| {
            ReconcileError::CreateFailed {
                cron_job: cron_job.object_ref.name.clone(),
                source: e,
            }
        }),
        effects::CreateOutcome::Failed(e) => Err(ReconcileError::CreateFailed {
            cron_job: cron_job.object_ref.name.clone(),
            source: e,
        }),
    }
}

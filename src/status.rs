//! Applies a decision to a *copy* of the CronJob, producing the new
//! `Status`. The original is never mutated.

use chrono::{DateTime, Utc};

use crate::model::{CronJob, ObjectRef};

/// The fields a reconcile tick may change on `Status`. `None` means
/// "leave as-is."
#[derive(Debug, Clone, Default)]
pub struct StatusDelta {
    pub active: Option<Vec<ObjectRef>>,
    pub last_schedule_time: Option<DateTime<Utc>>,
    pub last_successful_time: Option<DateTime<Utc>>,
}

/// Apply `delta` to a fresh copy of `original`. `original` is untouched.
pub fn apply(original: &CronJob, delta: &StatusDelta) -> CronJob {
    let mut copy = original.clone();
    if let Some(active) = &delta.active {
        copy.status.active = active.clone();
    }
    if let Some(t) = delta.last_schedule_time {
        copy.status.last_schedule_time = Some(t);
    }
    if let Some(t) = delta.last_successful_time {
        copy.status.last_successful_time = Some(t);
    }
    copy
}

/// Whether applying `delta` would actually change `original.status`.
/// Callers use this to skip a status update when nothing moved.
pub fn changed(original: &CronJob, delta: &StatusDelta) -> bool {
    if let Some(active) = &delta.active {
        if active.len() != original.status.active.len()
            || !active.iter().all(|r| original.status.active.iter().any(|o| o.uid == r.uid))
        {
            return true;
        }
    }
    if let Some(t) = delta.last_schedule_time {
        if Some(t) != original.status.last_schedule_time {
            return true;
        }
    }
    if let Some(t) = delta.last_successful_time {
        if Some(t) != original.status.last_successful_time {
            return true;
        }
    }
    false
}

/// A read-only snapshot of a CronJob's status, for callers that only
/// want to render state without re-deriving it from `Status` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CronJobStatusView {
    pub active_count: usize,
    pub last_schedule_time: Option<DateTime<Utc>>,
    pub last_successful_time: Option<DateTime<Utc>>,
}

pub fn view(cron_job: &CronJob) -> CronJobStatusView {
    CronJobStatusView {
        active_count: cron_job.status.active.len(),
        last_schedule_time: cron_job.status.last_schedule_time,
        last_successful_time: cron_job.status.last_successful_time,
    }
}

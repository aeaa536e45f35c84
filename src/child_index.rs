//! Reconciles the observed Job slice against the CronJob's own
//! `Status.Active` list, tolerating informer/status staleness in both
//! directions.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{CronJob, Job, ObjectRef};

/// The reconciled view produced from `(CronJob, observed Jobs)`.
#[derive(Debug, Clone, Default)]
pub struct ChildJobIndex {
    /// References the reconciler will carry forward in `Status.Active`.
    pub active: Vec<ObjectRef>,
    /// Jobs with a terminal `Complete` or `Failed` condition.
    pub finished: Vec<Job>,
    /// The latest `CompletionTime` among `Complete` children, if any.
    pub most_recent_completion: Option<DateTime<Utc>>,
}

/// Build the index from the CronJob's believed-active list and the
/// observed Job slice.
pub fn build(cron_job: &CronJob, observed: &[Job]) -> ChildJobIndex {
    let mut active = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut finished = Vec::new();
    let mut most_recent_completion: Option<DateTime<Utc>> = None;

    let claimed_by_reference: HashSet<Uuid> = cron_job.status.active.iter().map(|r| r.uid).collect();

    for job in observed {
        // Owner-match invariant: owned by controller-owner reference, or
        // already claimed by appearing in Status.Active by reference.
        if !job.is_owned_by(&cron_job.object_ref) && !claimed_by_reference.contains(&job.object_ref.uid) {
            continue;
        }
        if job.is_finished() {
            if job.is_complete() {
                if let Some(completion) = job.completion_time {
                    most_recent_completion = Some(match most_recent_completion {
                        Some(prev) if prev >= completion => prev,
                        _ => completion,
                    });
                }
            }
            finished.push(job.clone());
        } else if seen.insert(job.object_ref.uid) {
            active.push(job.object_ref.clone());
        }
    }

    // Lister staleness: a reference the CronJob believes is active but
    // that is entirely absent from the observed set is retained, not
    // dropped, this cycle.
    for stale_ref in &cron_job.status.active {
        if !observed.iter().any(|j| j.object_ref.uid == stale_ref.uid) && seen.insert(stale_ref.uid) {
            active.push(stale_ref.clone());
        }
    }

    ChildJobIndex {
        active,
        finished,
        most_recent_completion,
    }
}

impl ChildJobIndex {
    /// Finished children beyond the configured history limits, oldest
    /// first within each bucket. The core does not delete these itself —
    /// this is what an external pruner would read to decide what to
    /// garbage-collect.
    pub fn history_overflow(&self, limits: &crate::model::JobsHistoryLimits) -> Vec<ObjectRef> {
        let mut successful: Vec<&Job> = self.finished.iter().filter(|j| j.is_complete()).collect();
        let mut failed: Vec<&Job> = self.finished.iter().filter(|j| j.is_failed()).collect();
        successful.sort_by_key(|j| j.creation_timestamp);
        failed.sort_by_key(|j| j.creation_timestamp);

        let mut overflow = Vec::new();
        if successful.len() > limits.successful as usize {
            overflow.extend(successful[..successful.len() - limits.successful as usize].iter().map(|j| j.object_ref.clone()));
        }
        if failed.len() > limits.failed as usize {
            overflow.extend(failed[..failed.len() - limits.failed as usize].iter().map(|j| j.object_ref.clone()));
        }
        overflow
    }
}

//! Value types shared by every module: the CronJob/Job entities, their
//! object references, and the job template the controller materialises
//! children from.
//!
//! These are deliberately plain data — no behaviour beyond small derived
//! helpers (`Job::is_finished`, ...). The decision logic that interprets
//! them lives in `decision`, `child_index`, and `missed_starts`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A namespaced reference to an object, comparable by UID for identity
/// checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub namespace: String,
    pub name: String,
    pub uid: Uuid,
}

impl ObjectRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, uid: Uuid) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid,
        }
    }
}

/// A controller-owner reference, as carried by a child Job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: Uuid,
    pub controller: bool,
}

impl OwnerRef {
    /// The owner reference stamped on every Job this controller creates.
    pub fn for_cron_job(cron_job: &ObjectRef) -> Self {
        Self {
            api_version: "batch/v1".to_string(),
            kind: "CronJob".to_string(),
            name: cron_job.name.clone(),
            uid: cron_job.uid,
            controller: true,
        }
    }
}

/// Concurrency policy applied when a due tick coincides with active
/// children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConcurrencyPolicy {
    /// Let runs overlap.
    #[default]
    Allow,
    /// Skip this tick if any child is still active.
    Forbid,
    /// Preempt any active child before creating the new one.
    Replace,
}

/// The template a child Job is materialised from. Only the parts the
/// core needs to stamp onto a created Job are modelled; the rest of the
/// pod spec is opaque payload carried through unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobTemplateSpec {
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// Opaque pod/container payload, copied verbatim onto created Jobs.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Bounds on retained job history the core surfaces but does not itself
/// enforce by deletion — it tracks which finished refs exceed these so
/// an external pruner has something to act on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobsHistoryLimits {
    pub successful: u32,
    pub failed: u32,
}

impl Default for JobsHistoryLimits {
    fn default() -> Self {
        Self {
            successful: 3,
            failed: 1,
        }
    }
}

/// `Spec` half of a CronJob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJobSpec {
    /// A standard 5-field cron expression (minute hour day-of-month month day-of-week).
    pub schedule: String,
    /// IANA time zone name the schedule is evaluated in. `None` means UTC.
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub concurrency_policy: ConcurrencyPolicy,
    #[serde(default)]
    pub suspend: bool,
    /// `None` means "unbounded".
    #[serde(default)]
    pub starting_deadline_seconds: Option<i64>,
    pub job_template: JobTemplateSpec,
    #[serde(default)]
    pub jobs_history_limits: JobsHistoryLimits,
}

/// `Status` half of a CronJob. Mutated only via deep copies produced by
/// `status::apply`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CronJobStatus {
    pub active: Vec<ObjectRef>,
    pub last_schedule_time: Option<DateTime<Utc>>,
    pub last_successful_time: Option<DateTime<Utc>>,
}

/// A CronJob: immutable identity + spec, mutable status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJob {
    pub object_ref: ObjectRef,
    pub creation_timestamp: DateTime<Utc>,
    pub spec: CronJobSpec,
    pub status: CronJobStatus,
}

/// The two terminal condition kinds a Job can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobConditionType {
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCondition {
    pub condition_type: JobConditionType,
    pub status: bool,
}

/// An observed child Job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub object_ref: ObjectRef,
    pub owner_refs: Vec<OwnerRef>,
    pub creation_timestamp: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conditions: Vec<JobCondition>,
    /// Copied from `JobTemplateSpec::labels` at creation time, plus the
    /// injected `cronjob-name` label.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Copied from `JobTemplateSpec::annotations` at creation time.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// The opaque pod/container payload, copied verbatim from
    /// `JobTemplateSpec::payload`.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Job {
    /// True iff a `Complete` or `Failed` condition is true.
    pub fn is_finished(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| matches!(c.condition_type, JobConditionType::Complete | JobConditionType::Failed) && c.status)
    }

    pub fn is_complete(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.condition_type == JobConditionType::Complete && c.status)
    }

    pub fn is_failed(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.condition_type == JobConditionType::Failed && c.status)
    }

    /// A controller-owner reference with matching UID and
    /// `kind=CronJob`/`group=batch`.
    pub fn is_owned_by(&self, cron_job: &ObjectRef) -> bool {
        self.owner_refs
            .iter()
            .any(|o| o.controller && o.kind == "CronJob" && o.uid == cron_job.uid)
    }
}

//! The three narrow external collaborators the core talks to. Everything
//! else — informer wiring, workqueue plumbing, owner-reference garbage
//! collection, real API transport — lives outside this crate.

use crate::error::ApiError;
use crate::model::{CronJob, Job, ObjectRef};

/// Create/get/delete a Job. Implementations translate transport-layer
/// errors into `ApiError::{AlreadyExists, NotFound, Transient}`.
pub trait JobControl {
    fn create_job(&self, namespace: &str, job: Job) -> Result<Job, ApiError>;
    fn get_job(&self, namespace: &str, name: &str) -> Result<Job, ApiError>;
    fn delete_job(&self, namespace: &str, name: &str) -> Result<(), ApiError>;
}

/// Persist a CronJob's status. Called only when the core reports
/// `status_changed`.
pub trait CronJobControl {
    fn update_status(&self, cron_job: &CronJob) -> Result<CronJob, ApiError>;
}

/// `Normal` or `Warning`, matching the Kubernetes event type vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

/// Records a single event against an object. Reasons used by the core
/// include `UnparseableSchedule`, `TooManyMissedTimes`, `MissSchedule`,
/// `JobAlreadyActive`, `SuccessfulCreate`, `FailedCreate`,
/// `SuccessfulDelete`, `FailedDelete`, `SawCompletedJob`.
pub trait EventRecorder {
    fn event(&self, object: &ObjectRef, event_type: EventType, reason: &str, message: &str);
}

/// In-memory fakes of the three interfaces above, for unit and
/// integration tests. Not part of the crate's production surface.
pub mod fakes {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// A `JobControl` backed by an in-memory map, keyed by (namespace, name).
    #[derive(Default)]
    pub struct FakeJobControl {
        jobs: RefCell<HashMap<(String, String), Job>>,
    }

    impl FakeJobControl {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, job: Job) {
            let key = (job.object_ref.namespace.clone(), job.object_ref.name.clone());
            self.jobs.borrow_mut().insert(key, job);
        }

        pub fn len(&self) -> usize {
            self.jobs.borrow().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        pub fn contains(&self, namespace: &str, name: &str) -> bool {
            self.jobs.borrow().contains_key(&(namespace.to_string(), name.to_string()))
        }
    }

    impl JobControl for FakeJobControl {
        fn create_job(&self, namespace: &str, job: Job) -> Result<Job, ApiError> {
            let key = (namespace.to_string(), job.object_ref.name.clone());
            let mut jobs = self.jobs.borrow_mut();
            if jobs.contains_key(&key) {
                return Err(ApiError::AlreadyExists);
            }
            jobs.insert(key, job.clone());
            Ok(job)
        }

        fn get_job(&self, namespace: &str, name: &str) -> Result<Job, ApiError> {
            self.jobs
                .borrow()
                .get(&(namespace.to_string(), name.to_string()))
                .cloned()
                .ok_or(ApiError::NotFound)
        }

        fn delete_job(&self, namespace: &str, name: &str) -> Result<(), ApiError> {
            self.jobs
                .borrow_mut()
                .remove(&(namespace.to_string(), name.to_string()))
                .map(|_| ())
                .ok_or(ApiError::NotFound)
        }
    }

    /// A `CronJobControl` that just records the last status it was handed.
    #[derive(Default)]
    pub struct FakeCronJobControl {
        pub updates: RefCell<Vec<CronJob>>,
    }

    impl FakeCronJobControl {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn update_count(&self) -> usize {
            self.updates.borrow().len()
        }

        pub fn last(&self) -> Option<CronJob> {
            self.updates.borrow().last().cloned()
        }
    }

    impl CronJobControl for FakeCronJobControl {
        fn update_status(&self, cron_job: &CronJob) -> Result<CronJob, ApiError> {
            self.updates.borrow_mut().push(cron_job.clone());
            Ok(cron_job.clone())
        }
    }

    /// An `EventRecorder` that appends every event to a `Vec` for assertions.
    #[derive(Default)]
    pub struct FakeEventRecorder {
        pub events: RefCell<Vec<(EventType, String, String)>>,
    }

    impl FakeEventRecorder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn warnings(&self) -> Vec<(String, String)> {
            self.events
                .borrow()
                .iter()
                .filter(|(t, _, _)| *t == EventType::Warning)
                .map(|(_, r, m)| (r.clone(), m.clone()))
                .collect()
        }

        pub fn normal(&self) -> Vec<(String, String)> {
            self.events
                .borrow()
                .iter()
                .filter(|(t, _, _)| *t == EventType::Normal)
                .map(|(_, r, m)| (r.clone(), m.clone()))
                .collect()
        }
    }

    impl EventRecorder for FakeEventRecorder {
        fn event(&self, _object: &ObjectRef, event_type: EventType, reason: &str, message: &str) {
            self.events
                .borrow_mut()
                .push((event_type, reason.to_string(), message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use crate::model::{JobCondition, JobConditionType};
    use chrono::Utc;
    use uuid::Uuid;

    fn job(name: &str) -> Job {
        Job {
            object_ref: ObjectRef::new("default", name, Uuid::new_v4()),
            owner_refs: vec![],
            creation_timestamp: Utc::now(),
            completion_time: None,
            conditions: vec![JobCondition {
                condition_type: JobConditionType::Complete,
                status: false,
            }],
            labels: std::collections::HashMap::new(),
            annotations: std::collections::HashMap::new(),
            payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn fake_job_control_rejects_duplicate_create() {
        let control = FakeJobControl::new();
        control.create_job("default", job("a")).unwrap();
        let err = control.create_job("default", job("a")).unwrap_err();
        assert!(matches!(err, ApiError::AlreadyExists));
    }

    #[test]
    fn fake_job_control_delete_then_get_not_found() {
        let control = FakeJobControl::new();
        control.create_job("default", job("a")).unwrap();
        control.delete_job("default", "a").unwrap();
        assert!(matches!(control.get_job("default", "a"), Err(ApiError::NotFound)));
    }

    #[test]
    fn fake_event_recorder_splits_by_type() {
        let recorder = FakeEventRecorder::new();
        let obj = ObjectRef::new("default", "x", Uuid::new_v4());
        recorder.event(&obj, EventType::Warning, "MissSchedule", "boom");
        recorder.event(&obj, EventType::Normal, "SuccessfulCreate", "ok");
        assert_eq!(recorder.warnings().len(), 1);
        assert_eq!(recorder.normal().len(), 1);
    }
}

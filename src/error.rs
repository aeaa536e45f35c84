//! Error taxonomy. Kinds, not a single catch-all type: callers need to
//! tell a config mistake (no retry churn) from a transient API failure
//! (retry with backoff) from the benign `AlreadyExists` case.

use thiserror::Error;

/// Errors the external collaborators (`JobControl`, `CronJobControl`) can
/// report back to the reconciler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// JobControl::create_job found the name already taken — handled as
    /// success for idempotence.
    #[error("already exists")]
    AlreadyExists,
    /// JobControl::get_job / delete_job found nothing at that name.
    #[error("not found")]
    NotFound,
    /// Any other API-layer failure: surfaced to the caller, who retries
    /// via the workqueue with backoff.
    #[error("transient API error: {0}")]
    Transient(String),
}

/// Error returned from a full `sync_cron_job` invocation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Job creation failed for a reason other than `AlreadyExists`.
    /// `LastScheduleTime` was not advanced.
    #[error("failed to create job for cron job {cron_job}: {source}")]
    CreateFailed {
        cron_job: String,
        #[source]
        source: ApiError,
    },
    /// The CronJob status update failed after effects were applied.
    #[error("failed to update status for cron job {cron_job}: {source}")]
    StatusUpdateFailed {
        cron_job: String,
        #[source]
        source: ApiError,
    },
}

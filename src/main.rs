//! `cronctl` — a small CLI that replays a CronJob scenario (a CronJob,
//! its observed Jobs, and an instant) through [`cronctl::sync_cron_job`] and prints the
//! resulting decision. Useful for exercising the core outside of a real
//! cluster: feed it the JSON scenarios used by the integration tests, or
//! a hand-written one, and see what the controller would have done.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cronctl::interfaces::fakes::{FakeCronJobControl, FakeEventRecorder, FakeJobControl};
use cronctl::model::{CronJob, Job};
use cronctl::{config, reconciler, trigger_now, sync_cron_job, ReconcilerConfig};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "cronctl")]
#[command(about = "Replay CronJob reconcile scenarios against the decision core")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file overriding the default ReconcilerConfig.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconcile tick and print the outcome.
    Sync {
        /// JSON scenario file: {"cron_job": ..., "observed_jobs": [...], "now": "..."}
        scenario: PathBuf,
    },
    /// Force-create a Job right now, bypassing the schedule check.
    Trigger {
        /// JSON scenario file: {"cron_job": ..., "observed_jobs": [...], "now": "..."}
        scenario: PathBuf,
    },
}

#[derive(Deserialize)]
struct Scenario {
    cron_job: CronJob,
    #[serde(default)]
    observed_jobs: Vec<Job>,
    now: chrono::DateTime<chrono::Utc>,
}

fn load_scenario(path: &PathBuf) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading scenario file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing scenario file {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let app_config = match &cli.config {
        Some(path) => config::AppConfig::from_file(path).with_context(|| format!("loading config file {}", path.display()))?,
        None => config::AppConfig::from_env()?,
    };
    config::init_tracing(&app_config.logging);

    match cli.command {
        Commands::Sync { scenario } => run_sync(&scenario, &app_config.reconciler_config()),
        Commands::Trigger { scenario } => run_trigger(&scenario),
    }
}

fn run_sync(scenario_path: &PathBuf, reconciler_config: &ReconcilerConfig) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;

    let job_control = FakeJobControl::new();
    for job in &scenario.observed_jobs {
        job_control.seed(job.clone());
    }
    let cronjob_control = FakeCronJobControl::new();
    let events = FakeEventRecorder::new();

    let result = sync_cron_job(
        &scenario.cron_job,
        &scenario.observed_jobs,
        scenario.now,
        reconciler_config,
        &job_control,
        &cronjob_control,
        &events,
    )?;

    for (reason, message) in events.normal() {
        tracing::info!(reason = %reason, "{message}");
    }
    for (reason, message) in events.warnings() {
        tracing::warn!(reason = %reason, "{message}");
    }

    println!("{}", serde_json::to_string_pretty(&SyncReport::from(&result))?);
    Ok(())
}

fn run_trigger(scenario_path: &PathBuf) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;

    let job_control = FakeJobControl::new();
    for job in &scenario.observed_jobs {
        job_control.seed(job.clone());
    }
    let events = FakeEventRecorder::new();

    let job = trigger_now(&scenario.cron_job, &scenario.observed_jobs, scenario.now, &job_control, &events)?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}

/// Flat, CLI-friendly view of a [`reconciler::SyncResult`].
#[derive(serde::Serialize)]
struct SyncReport {
    status_changed: bool,
    requeue_after_seconds: Option<i64>,
    active_children: usize,
    last_schedule_time: Option<chrono::DateTime<chrono::Utc>>,
    last_successful_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&reconciler::SyncResult> for SyncReport {
    fn from(result: &reconciler::SyncResult) -> Self {
        Self {
            status_changed: result.status_changed,
            requeue_after_seconds: result.requeue_after.map(|d| d.num_seconds()),
            active_children: result.cron_job.status.active.len(),
            last_schedule_time: result.cron_job.status.last_schedule_time,
            last_successful_time: result.cron_job.status.last_successful_time,
        }
    }
}

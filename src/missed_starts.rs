//! Finds the most recent unstarted scheduled time at or before `now`,
//! bounding the scan so a long-stalled CronJob can't burn unbounded CPU
//! catching up.

use chrono::{DateTime, Duration, Utc};

use crate::schedule::ParsedSchedule;
use crate::time_math::earliest_time;

/// Scheduled times missed beyond this count surface `too_many = true`.
pub const MAX_MISSED_STARTS: u64 = 100;

/// Safety backstop distinct from `MAX_MISSED_STARTS`: stops the scan
/// outright after this many fire times so a pathological sub-second
/// schedule left unreconciled for months can't spin forever. The
/// 100-miss warning already fires long before this is ever reached.
const SCAN_HARD_CAP: u64 = 10_000;

/// Outcome of enumerating missed starts between `earliest` and `now`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissedStarts {
    /// The latest scheduled time <= `now`, if any fired since `earliest`.
    pub scheduled_time: Option<DateTime<Utc>>,
    /// How many scheduled times were found in the window.
    pub missed_count: u64,
    /// True if `missed_count` exceeded `MAX_MISSED_STARTS`.
    pub too_many: bool,
}

impl MissedStarts {
    fn none() -> Self {
        Self {
            scheduled_time: None,
            missed_count: 0,
            too_many: false,
        }
    }
}

/// Enumerate missed starts for a schedule, given the CronJob's recorded
/// progress and an optional starting-deadline bound.
pub fn enumerate(
    schedule: &ParsedSchedule,
    last_schedule_time: Option<DateTime<Utc>>,
    creation_timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    deadline: Option<Duration>,
) -> MissedStarts {
    let earliest = earliest_time(last_schedule_time, creation_timestamp, now, deadline);
    if earliest >= now {
        return MissedStarts::none();
    }

    let mut count = 0u64;
    let mut latest = None;
    for fire_time in schedule.between(earliest, now) {
        count += 1;
        latest = Some(fire_time);
        if count >= SCAN_HARD_CAP {
            break;
        }
    }

    MissedStarts {
        scheduled_time: latest,
        missed_count: count,
        too_many: count > MAX_MISSED_STARTS,
    }
}

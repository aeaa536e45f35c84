//! Requeue-after computation and deadline arithmetic shared by
//! `missed_starts` and `decision`.

use chrono::{DateTime, Duration, Utc};

use crate::schedule::ParsedSchedule;

/// Fixed positive slack added to every requeue so the reconciler wakes
/// just after the scheduled instant, never before it.
pub const NEXT_SCHEDULE_DELTA: Duration = Duration::seconds(10);

/// `requeueAfter = Next(now) - now + slack`. `None` if the schedule
/// never fires again (unreachable in practice for a schedule
/// `ParsedSchedule` accepted, but kept total).
pub fn requeue_after(schedule: &ParsedSchedule, now: DateTime<Utc>) -> Option<Duration> {
    schedule.next(now).map(|next| (next - now) + NEXT_SCHEDULE_DELTA)
}

/// The earliest time from which missed starts should be enumerated:
/// `last_schedule_time` if set, else `creation_timestamp`, pulled forward
/// to `now - deadline` when a deadline is set.
pub fn earliest_time(
    last_schedule_time: Option<DateTime<Utc>>,
    creation_timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    deadline: Option<Duration>,
) -> DateTime<Utc> {
    let base = last_schedule_time.unwrap_or(creation_timestamp);
    match deadline {
        Some(d) => base.max(now - d),
        None => base,
    }
}

/// Whether `now - scheduled_time` exceeds `deadline`.
pub fn deadline_exceeded(scheduled_time: DateTime<Utc>, now: DateTime<Utc>, deadline: Option<Duration>) -> bool {
    match deadline {
        Some(d) => now - scheduled_time > d,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 5, 19, h, mi, 0).unwrap()
    }

    #[test]
    fn requeue_after_adds_slack() {
        let schedule = ParsedSchedule::parse("0 * * * *").unwrap();
        let now = t(9, 59);
        let d = requeue_after(&schedule, now).unwrap();
        assert_eq!(d, Duration::minutes(1) + NEXT_SCHEDULE_DELTA);
    }

    #[test]
    fn earliest_time_uses_last_schedule_when_set() {
        let last = t(9, 0);
        let created = t(8, 0);
        let now = t(10, 0);
        assert_eq!(earliest_time(Some(last), created, now, None), last);
    }

    #[test]
    fn earliest_time_falls_back_to_creation() {
        let created = t(8, 0);
        let now = t(10, 0);
        assert_eq!(earliest_time(None, created, now, None), created);
    }

    #[test]
    fn earliest_time_is_pulled_forward_by_deadline() {
        let created = t(0, 0);
        let now = t(10, 1);
        let deadline = Duration::seconds(10);
        let earliest = earliest_time(None, created, now, Some(deadline));
        assert_eq!(earliest, now - deadline);
    }

    #[test]
    fn deadline_exceeded_when_lag_too_large() {
        let scheduled = t(10, 0);
        let now = t(10, 11);
        assert!(deadline_exceeded(scheduled, now, Some(Duration::seconds(10))));
        assert!(!deadline_exceeded(scheduled, now, Some(Duration::minutes(20))));
        assert!(!deadline_exceeded(scheduled, now, None));
    }
}

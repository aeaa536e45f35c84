//! Parses a standard 5-field cron expression (minute hour day-of-month
//! month day-of-week) and exposes `next`/`prev`.
//!
//! The `cron` crate requires a leading seconds field, so a 5-field
//! expression is parsed by prepending a fixed `"0"` seconds field
//! internally — the original 5-field text is preserved for error
//! messages and is what every caller sees and writes.
//!
//! A schedule is evaluated in a location: UTC by default, or an IANA
//! timezone name (`Spec.TimeZone`, the upstream CronJob field spec.md's
//! distillation left out) when one is supplied. `next`/`prev` always
//! take and return `DateTime<Utc>`; the timezone only affects which
//! wall-clock instants the cron fields line up with (DST transitions,
//! local midnight, ...).

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use thiserror::Error;

/// The schedule text, or its timezone, didn't parse. Carries the
/// original text, not the `cron` crate's internal 6-field rewrite, so
/// callers see what they typed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidSchedule {
    #[error("invalid schedule {0:?}: not a valid 5-field cron expression")]
    Expression(String),
    #[error("invalid time zone {0:?}: not a recognised IANA time zone name")]
    TimeZone(String),
}

/// A parsed, immutable cron schedule bound to a location.
#[derive(Debug, Clone)]
pub struct ParsedSchedule {
    original: String,
    inner: CronSchedule,
    tz: Tz,
}

impl ParsedSchedule {
    /// Parse a standard 5-field cron expression, evaluated in UTC.
    pub fn parse(expr: &str) -> Result<Self, InvalidSchedule> {
        Self::parse_in(expr, None)
    }

    /// Parse a standard 5-field cron expression, evaluated in `time_zone`
    /// (an IANA name such as `"America/New_York"`) when given, else UTC.
    pub fn parse_in(expr: &str, time_zone: Option<&str>) -> Result<Self, InvalidSchedule> {
        let trimmed = expr.trim();
        if trimmed.split_whitespace().count() != 5 {
            return Err(InvalidSchedule::Expression(expr.to_string()));
        }
        let with_seconds = format!("0 {trimmed}");
        let inner = CronSchedule::from_str(&with_seconds).map_err(|_| InvalidSchedule::Expression(expr.to_string()))?;
        let tz = match time_zone {
            Some(name) => Tz::from_str(name).map_err(|_| InvalidSchedule::TimeZone(name.to_string()))?,
            None => Tz::UTC,
        };
        Ok(Self {
            original: expr.to_string(),
            inner,
            tz,
        })
    }

    pub fn original_text(&self) -> &str {
        &self.original
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    /// The next scheduled time strictly after `after`, converted back to UTC.
    pub fn next(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&self.tz);
        self.inner.after(&local).next().map(|t| t.with_timezone(&Utc))
    }

    /// The most recent scheduled time strictly before `before`.
    ///
    /// The underlying `cron` crate only iterates forward, so this walks
    /// backward in widening windows until a fire time under `before` is
    /// found or the search gives up (two years back, which comfortably
    /// covers every expression this parser accepts).
    pub fn prev(&self, before: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local_before = before.with_timezone(&self.tz);
        let mut window = Duration::days(1);
        let max_window = Duration::days(730);
        loop {
            let floor = local_before - window;
            let candidate = self.inner.after(&floor).take_while(|t| *t < local_before).last();
            if let Some(candidate) = candidate {
                return Some(candidate.with_timezone(&Utc));
            }
            if window >= max_window {
                return None;
            }
            window = window * 2;
        }
    }

    /// Every scheduled time strictly after `after` and at-or-before `before`.
    pub fn between(&self, after: DateTime<Utc>, before: DateTime<Utc>) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        let local_before = before.with_timezone(&self.tz);
        self.inner
            .after(&after.with_timezone(&self.tz))
            .take_while(move |t| *t <= local_before)
            .map(|t| t.with_timezone(&Utc))
    }
}

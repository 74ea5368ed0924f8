//! Cron expression parsing and next-fire-time computation, per
//! SPEC_FULL.md §4.4.2 step 2 and §4.4.6.
//!
//! The platform's cron syntax is the standard 5-field form (`minute hour
//! day-of-month month day-of-week`, SPEC_FULL.md §6.3); the `cron` crate
//! expects a leading seconds field, so a bare `"0 "` is prepended before
//! parsing.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;
use taskloom_kernel::error::CoreError;

/// Computes the next time `cron_expression` fires at or after `from`,
/// evaluated in `timezone` (an IANA zone name; `None` or empty means UTC)
/// and converted back to UTC for storage.
pub fn next_fire_time(
    cron_expression: &str,
    timezone: Option<&str>,
    from: DateTime<Utc>,
) -> Result<DateTime<Utc>, CoreError> {
    let schedule = parse_schedule(cron_expression)?;
    let tz = resolve_timezone(timezone)?;
    let from_in_tz = from.with_timezone(&tz);
    schedule
        .after(&from_in_tz)
        .next()
        .map(|fired| fired.with_timezone(&Utc))
        .ok_or_else(|| CoreError::InvalidCron(format!("`{cron_expression}` has no upcoming fire time")))
}

/// Validates a cron expression without computing a fire time, used by
/// schedule create/update per SPEC_FULL.md §6.3 ("invalid expressions are
/// rejected at create/update time").
pub fn validate_cron_expression(cron_expression: &str) -> Result<(), CoreError> {
    parse_schedule(cron_expression).map(|_| ())
}

fn parse_schedule(cron_expression: &str) -> Result<CronSchedule, CoreError> {
    let trimmed = cron_expression.trim();
    let field_count = trimmed.split_whitespace().count();
    let with_seconds = if field_count == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    };
    CronSchedule::from_str(&with_seconds)
        .map_err(|err| CoreError::InvalidCron(format!("`{cron_expression}`: {err}")))
}

fn resolve_timezone(timezone: Option<&str>) -> Result<Tz, CoreError> {
    match timezone.map(str::trim) {
        None | Some("") => Ok(Tz::UTC),
        Some(name) => Tz::from_str(name).map_err(|_| CoreError::InvalidCron(format!("unknown timezone: {name}"))),
    }
}

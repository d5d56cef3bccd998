//! Calendar arithmetic for project deletion and the daily lifecycle sweep.
//!
//! Day boundaries are evaluated in a fixed UTC offset (the deployment's
//! local time), so "today" and "tomorrow" match what project members see.

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::CoreError;
use crate::models::Project;
use crate::types::Timestamp;

/// Days between a delete request and permanent deletion.
pub const GRACE_PERIOD_DAYS: i64 = 7;

/// Hard-delete deadline for a project deleted at `requested_at`.
pub fn hard_delete_deadline(requested_at: Timestamp) -> Timestamp {
    requested_at + Duration::days(GRACE_PERIOD_DAYS)
}

/// A project may be restored only while its deadline is still ahead.
pub fn ensure_restorable(project: &Project, now: Timestamp) -> Result<(), CoreError> {
    match project.deleted_at {
        None => Err(CoreError::forbidden("project is not deleted")),
        Some(deadline) if deadline <= now => Err(CoreError::forbidden(
            "the grace period has elapsed; the project can no longer be restored",
        )),
        Some(_) => Ok(()),
    }
}

/// The calendar date of `ts` in `offset`.
pub fn local_date(ts: Timestamp, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

/// Half-open UTC window `[start, end)` covering `date` in `offset`.
pub fn day_bounds(date: NaiveDate, offset: FixedOffset) -> (Timestamp, Timestamp) {
    let start = local_to_utc(date.and_time(NaiveTime::MIN), offset);
    (start, start + Duration::days(1))
}

/// The next instant strictly after `now` at which the wall clock in `offset`
/// reads `run_at`.
pub fn next_run_at(now: Timestamp, run_at: NaiveTime, offset: FixedOffset) -> Timestamp {
    let local_now = now.with_timezone(&offset).naive_local();
    let mut candidate = local_now.date().and_time(run_at);
    if candidate <= local_now {
        candidate += Duration::days(1);
    }
    local_to_utc(candidate, offset)
}

fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> Timestamp {
    (local - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

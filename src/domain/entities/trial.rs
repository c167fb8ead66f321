use chrono::{DateTime, Duration, Utc};

/// Length of the free trial, counted from the stored trial start.
pub const TRIAL_DAYS: i64 = 7;

pub fn trial_window() -> Duration {
    Duration::days(TRIAL_DAYS)
}

/// A trial is over once a full window has elapsed since it started.
pub fn is_expired(trial_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - trial_start >= trial_window()
}

pub fn trial_end(trial_start: DateTime<Utc>) -> DateTime<Utc> {
    trial_start + trial_window()
}

/// Whole days left in the trial, never negative.
pub fn days_remaining(trial_start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let left = trial_end(trial_start) - now;
    if left <= Duration::zero() {
        return 0;
    }
    // Round partial days up so the last day still reads as "1 day left".
    (left + Duration::days(1) - Duration::nanoseconds(1)).num_days()
}

/// Trial starts at or before this instant are expired at `now`.
pub fn expiry_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - trial_window()
}

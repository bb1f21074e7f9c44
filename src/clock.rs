//! Scheduler day boundaries.
//!
//! Review windows are anchored to the end of the current scheduling day,
//! not to the wall clock, so that "the last 31 days" means the same thing
//! to the estimator as it does to the scheduler's own day rollover.

use chrono::{DateTime, Days, Local, NaiveTime, TimeDelta, TimeZone};

pub const SECONDS_PER_DAY: i64 = 86_400;

pub trait DayClock {
    /// Unix timestamp, in seconds, at which the current scheduling day ends.
    fn current_day_cutoff(&self) -> i64;
}

/// Rolls the day over at a fixed local hour.
#[derive(Debug, Copy, Clone)]
pub struct SchedulerClock {
    rollover: NaiveTime,
}

impl SchedulerClock {
    pub fn new(rollover_hour: u32) -> Self {
        Self {
            rollover: NaiveTime::from_hms_opt(rollover_hour.min(23), 0, 0)
                .unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn cutoff_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> i64 {
        let tz = now.timezone();
        let mut day = now.date_naive();
        if now.time() >= self.rollover {
            day = day.checked_add_days(Days::new(1)).unwrap_or(day);
        }
        let boundary = day.and_time(self.rollover);
        // A rollover inside a DST gap happens at the first valid instant after it.
        tz.from_local_datetime(&boundary)
            .earliest()
            .or_else(|| {
                tz.from_local_datetime(&(boundary + TimeDelta::hours(1)))
                    .earliest()
            })
            .map(|t| t.timestamp())
            .unwrap_or_else(|| boundary.and_utc().timestamp())
    }
}

impl DayClock for SchedulerClock {
    fn current_day_cutoff(&self) -> i64 {
        self.cutoff_at(&Local::now())
    }
}

/// A clock frozen at a given cutoff.
#[derive(Debug, Copy, Clone)]
pub struct FixedClock(pub i64);

impl DayClock for FixedClock {
    fn current_day_cutoff(&self) -> i64 {
        self.0
    }
}

//! Error types for the scheduler.

use thiserror::Error;

/// Errors that can occur building a schedule.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Unknown weekday name.
    #[error("invalid weekday: {0}")]
    InvalidWeekday(String),

    /// Time not in `HH:MM` form.
    #[error("invalid time of day: {0}")]
    InvalidTime(String),

    /// Not an IANA timezone name.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    /// A schedule needs at least one slot.
    #[error("schedule has no slots")]
    EmptySchedule,
}

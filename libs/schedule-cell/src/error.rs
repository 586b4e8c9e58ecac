use chrono::NaiveDate;
use thiserror::Error;

/// Validation and transition failures. These are resolved locally, never
/// reach the network, and leave the previous schedule untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid time range: {reason}")]
    InvalidTimeRange { reason: String },

    #[error("Schedule too short: at least {required} minutes required, got {actual}")]
    DurationTooShort { required: i64, actual: i64 },

    #[error("Break time must fall within the schedule window {window}")]
    BreakOutsideWindow { window: String },

    #[error("A schedule already exists for {date}; confirm before replacing it")]
    ScheduleExists { date: NaiveDate },

    #[error("No schedule set for today")]
    NoScheduleSet,

    #[error("Outside scheduled hours (today's window is {window})")]
    OutsideScheduledHours { window: String },
}

/// Failures from the availability store. Persistence errors do not roll
/// back local transitions; the controller records them and retries.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Schedule not found")]
    NotFound,

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

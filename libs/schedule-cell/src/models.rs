use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum schedule length when revising an existing day.
pub const MIN_SCHEDULE_MINUTES: i64 = 30;
/// Minimum schedule length for the first-login setup flow.
pub const MIN_INITIAL_SETUP_MINUTES: i64 = 60;
/// How close to the end of the window the ending-soon warning fires.
pub const ENDING_SOON_WARN_MINUTES: i64 = 15;

/// Optional break attached to a daily schedule. Validation only: the break
/// does not affect the online/offline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakTime {
    pub enabled: bool,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// One doctor's working-hours schedule for a single calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    #[serde(default)]
    pub break_time: Option<BreakTime>,
    pub submitted_at: DateTime<Utc>,
}

impl DailySchedule {
    /// Whether `time` falls inside the schedule window. The end of the
    /// window is exclusive: reaching it counts as expiry, not presence.
    /// An end before the start means the window wraps past midnight
    /// (produced by the extension flow).
    pub fn in_window(&self, time: NaiveTime) -> bool {
        if self.start_time <= self.end_time {
            self.start_time <= time && time < self.end_time
        } else {
            time >= self.start_time || time < self.end_time
        }
    }

    /// Whether `time` is at/after the end of the window.
    pub fn expired_at(&self, time: NaiveTime) -> bool {
        if self.start_time <= self.end_time {
            time >= self.end_time
        } else {
            !self.in_window(time)
        }
    }

    pub fn window_label(&self) -> String {
        window_label(self.start_time, self.end_time)
    }
}

pub fn window_label(start: NaiveTime, end: NaiveTime) -> String {
    format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
}

/// Availability flag mirrored to the backend. Online status is derived:
/// available AND the schedule is active AND the clock is inside the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityState {
    pub is_available: bool,
}

/// The schedule edit form as submitted: fields may be empty, and empty
/// fields are rejected by validation rather than made unrepresentable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDraft {
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub break_time: Option<BreakTime>,
}

impl ScheduleDraft {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start_time: Some(start),
            end_time: Some(end),
            break_time: None,
        }
    }
}

/// Which minimum-duration rule applies to a schedule write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupMode {
    /// First-login setup; enforces the stricter 60-minute minimum.
    Initial,
    /// Any later edit of the day's schedule.
    Revision,
}

impl SetupMode {
    pub fn min_duration_minutes(&self) -> i64 {
        match self {
            SetupMode::Initial => MIN_INITIAL_SETUP_MINUTES,
            SetupMode::Revision => MIN_SCHEDULE_MINUTES,
        }
    }
}

/// Observable position of the schedule state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleState {
    /// No schedule exists for today (or it has been deactivated).
    NoSchedule,
    /// Schedule exists, current time is before the start of the window.
    Pending,
    /// Inside the window but the doctor has not gone online.
    ActiveOffline,
    /// Inside the window and accepting appointments.
    Online,
    /// Current time is at/after the end of the window.
    Expired,
}

/// Events the controller raises for the embedding layer to present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchedulePrompt {
    /// No schedule for today; ask the doctor to set one up.
    SetupRequired,
    /// The window just opened (or was already open when submitted); offer
    /// to go online.
    ScheduleStarted { start: NaiveTime, end: NaiveTime },
    /// The window closes shortly.
    EndingSoon { minutes_left: i64 },
    /// The window closed while online; offer to extend or stay offline.
    Expired,
    /// A backend write failed; local state is applied, sync is deferred.
    SyncWarning { reason: String },
}

impl std::fmt::Display for SchedulePrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulePrompt::SetupRequired => {
                write!(f, "No schedule set for today. Set your working hours to go online.")
            }
            SchedulePrompt::ScheduleStarted { start, end } => write!(
                f,
                "Your schedule ({}) has started. Go online to accept appointments.",
                window_label(*start, *end)
            ),
            SchedulePrompt::EndingSoon { minutes_left } => {
                write!(f, "Your schedule ends in {} minutes.", minutes_left)
            }
            SchedulePrompt::Expired => write!(
                f,
                "Your schedule has ended and you are now offline. Extend it to keep working."
            ),
            SchedulePrompt::SyncWarning { reason } => write!(
                f,
                "Your change was applied locally but could not be synced: {}",
                reason
            ),
        }
    }
}

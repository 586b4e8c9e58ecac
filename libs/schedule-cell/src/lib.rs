pub mod clock;
pub mod controller;
pub mod error;
pub mod models;
pub mod monitor;
pub mod remote;
pub mod snapshot;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::ScheduleAvailabilityController;
pub use error::{ScheduleError, StoreError};
pub use models::{
    AvailabilityState, BreakTime, DailySchedule, ScheduleDraft, SchedulePrompt, ScheduleState,
    SetupMode,
};
pub use monitor::{MonitorHandle, ScheduleMonitor};
pub use remote::HttpAvailabilityStore;
pub use snapshot::{ScheduleSnapshot, SnapshotError};
pub use store::{AvailabilityStore, AvailabilityUpdate, MemoryStore};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{ScheduleError, StoreError};
use crate::models::{
    window_label, AvailabilityState, BreakTime, DailySchedule, ScheduleDraft, SchedulePrompt,
    ScheduleState, SetupMode, ENDING_SOON_WARN_MINUTES,
};
use crate::snapshot::{ScheduleSnapshot, SnapshotError, SNAPSHOT_TTL_HOURS};
use crate::store::{AvailabilityStore, AvailabilityUpdate};

const MAX_SYNC_ATTEMPTS: u32 = 5;
const SYNC_BACKOFF_BASE_SECONDS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncKind {
    Schedule,
    Availability,
    Both,
}

impl SyncKind {
    fn merge(self, other: SyncKind) -> SyncKind {
        if self == other {
            self
        } else {
            SyncKind::Both
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingSync {
    kind: SyncKind,
    attempts: u32,
    next_retry_at: DateTime<Utc>,
}

/// Owns a doctor's daily schedule and online/offline state machine.
///
/// Transitions are level-triggered: `tick` recomputes everything from the
/// sampled clock, so the polling granularity does not matter. Persistence
/// is optimistic: local state is applied first, and failed writes are
/// retried with bounded backoff without ever rolling the machine back.
pub struct ScheduleAvailabilityController<S, C> {
    doctor_id: Uuid,
    store: S,
    clock: C,
    schedule: Option<DailySchedule>,
    availability: AvailabilityState,
    started_prompt_fired: bool,
    ending_soon_fired: bool,
    expired_prompt_fired: bool,
    pending_sync: Option<PendingSync>,
    prompts: Vec<SchedulePrompt>,
}

impl<S, C> ScheduleAvailabilityController<S, C>
where
    S: AvailabilityStore,
    C: Clock,
{
    pub fn new(doctor_id: Uuid, store: S, clock: C) -> Self {
        Self {
            doctor_id,
            store,
            clock,
            schedule: None,
            availability: AvailabilityState::default(),
            started_prompt_fired: false,
            ending_soon_fired: false,
            expired_prompt_fired: false,
            pending_sync: None,
            prompts: Vec::new(),
        }
    }

    pub fn doctor_id(&self) -> Uuid {
        self.doctor_id
    }

    pub fn schedule(&self) -> Option<&DailySchedule> {
        self.schedule.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.availability.is_available
    }

    pub fn is_online(&self) -> bool {
        self.state() == ScheduleState::Online
    }

    pub fn state(&self) -> ScheduleState {
        self.state_at(self.clock.now())
    }

    /// Take the prompts accumulated since the last drain.
    pub fn drain_prompts(&mut self) -> Vec<SchedulePrompt> {
        std::mem::take(&mut self.prompts)
    }

    /// Whether a failed write is still waiting to be re-synced.
    pub fn has_pending_sync(&self) -> bool {
        self.pending_sync.is_some()
    }

    fn state_at(&self, now: DateTime<Utc>) -> ScheduleState {
        let schedule = match &self.schedule {
            Some(s) if s.is_active && s.date == now.date_naive() => s,
            _ => return ScheduleState::NoSchedule,
        };

        let time = now.time();
        if schedule.in_window(time) {
            if self.availability.is_available {
                ScheduleState::Online
            } else {
                ScheduleState::ActiveOffline
            }
        } else if schedule.expired_at(time) {
            ScheduleState::Expired
        } else {
            ScheduleState::Pending
        }
    }

    /// Load today's schedule from the store, letting the remote copy
    /// overwrite any local state that failed to sync earlier.
    pub async fn initialize(&mut self) -> Result<ScheduleState, StoreError> {
        let now = self.clock.now();
        let loaded = self.store.load_today_schedule(self.doctor_id).await?;

        self.pending_sync = None;
        self.reset_day_flags();

        match loaded {
            Some(schedule) if schedule.date == now.date_naive() => {
                debug!(
                    "Loaded schedule for doctor {}: {}",
                    self.doctor_id,
                    schedule.window_label()
                );
                self.schedule = Some(schedule);
            }
            _ => {
                self.schedule = None;
                self.prompts.push(SchedulePrompt::SetupRequired);
            }
        }

        Ok(self.state_at(now))
    }

    /// Validate and adopt a new schedule for today, then persist it.
    ///
    /// Validation failures leave the previous schedule untouched. When a
    /// schedule for today already exists, the caller must pass
    /// `overwrite = true` (the confirmed path) or the write is rejected.
    pub async fn set_schedule(
        &mut self,
        draft: ScheduleDraft,
        mode: SetupMode,
        overwrite: bool,
    ) -> Result<ScheduleState, ScheduleError> {
        let now = self.clock.now();
        let today = now.date_naive();

        if !overwrite {
            if let Some(existing) = &self.schedule {
                if existing.date == today {
                    return Err(ScheduleError::ScheduleExists { date: today });
                }
            }
        }

        let (start, end) = validate_draft(&draft, mode)?;

        let schedule = DailySchedule {
            date: today,
            start_time: start,
            end_time: end,
            is_active: true,
            break_time: draft.break_time,
            submitted_at: now,
        };

        info!(
            "Schedule set for doctor {} on {}: {}",
            self.doctor_id,
            today,
            schedule.window_label()
        );

        self.schedule = Some(schedule);
        self.reset_day_flags();

        if self.schedule.as_ref().map(|s| s.in_window(now.time())) == Some(true) {
            // The window is already open; offer to go online right away.
            self.prompts
                .push(SchedulePrompt::ScheduleStarted { start, end });
            self.started_prompt_fired = true;
        }

        self.persist_schedule(now).await;
        Ok(self.state_at(now))
    }

    /// Start accepting appointments. Succeeds only with an active schedule
    /// whose window contains the current time.
    pub async fn go_online(&mut self) -> Result<ScheduleState, ScheduleError> {
        let now = self.clock.now();

        let window = match &self.schedule {
            Some(s) if s.is_active && s.date == now.date_naive() => {
                if !s.in_window(now.time()) {
                    return Err(ScheduleError::OutsideScheduledHours {
                        window: s.window_label(),
                    });
                }
                s.window_label()
            }
            _ => return Err(ScheduleError::NoScheduleSet),
        };

        info!("Doctor {} online ({})", self.doctor_id, window);
        self.availability.is_available = true;
        self.persist_availability(now).await;
        Ok(self.state_at(now))
    }

    /// Stop accepting appointments.
    pub async fn go_offline(&mut self) -> ScheduleState {
        let now = self.clock.now();
        info!("Doctor {} going offline", self.doctor_id);
        self.availability.is_available = false;
        self.persist_availability(now).await;
        self.state_at(now)
    }

    /// Push the end of today's window forward by `hours`, wrapping past
    /// midnight, and re-enter online state when the new window covers the
    /// current time.
    pub async fn extend(&mut self, hours: u32) -> Result<ScheduleState, ScheduleError> {
        if hours == 0 {
            return Err(ScheduleError::InvalidTimeRange {
                reason: "extension must be at least one hour".to_string(),
            });
        }

        let now = self.clock.now();
        let in_window;
        {
            let schedule = self.schedule.as_mut().ok_or(ScheduleError::NoScheduleSet)?;
            // NaiveTime arithmetic wraps around midnight, which is exactly
            // the mod-24 semantics the extension flow wants.
            schedule.end_time = schedule.end_time + Duration::hours(i64::from(hours));
            schedule.submitted_at = now;
            in_window = schedule.in_window(now.time());
            info!(
                "Doctor {} extended schedule by {}h, new window {}",
                self.doctor_id,
                hours,
                schedule.window_label()
            );
        }

        self.availability.is_available = in_window;
        // Re-arm the end-of-window prompts for the amended window.
        self.ending_soon_fired = false;
        self.expired_prompt_fired = false;

        self.persist_schedule(now).await;
        self.persist_availability(now).await;
        Ok(self.state_at(now))
    }

    /// Re-evaluate every transition condition against the sampled clock.
    pub async fn tick(&mut self) {
        let now = self.clock.now();
        self.rollover_if_needed(now);

        let active = self
            .schedule
            .clone()
            .filter(|s| s.is_active);
        if let Some(schedule) = active {
            let time = now.time();

            // Pending -> ActiveOffline: the window opened since last tick.
            if schedule.in_window(time) && !self.started_prompt_fired {
                if self.recently_submitted(&schedule, now) {
                    self.prompts.push(SchedulePrompt::ScheduleStarted {
                        start: schedule.start_time,
                        end: schedule.end_time,
                    });
                }
                self.started_prompt_fired = true;
            }

            // Online nearing the end of the window.
            if self.availability.is_available && schedule.in_window(time) && !self.ending_soon_fired
            {
                let minutes_left = minutes_to_end(&schedule, time);
                if minutes_left <= ENDING_SOON_WARN_MINUTES {
                    self.prompts.push(SchedulePrompt::EndingSoon { minutes_left });
                    self.ending_soon_fired = true;
                }
            }

            // Online -> Expired: force offline exactly once.
            if schedule.expired_at(time) && self.availability.is_available {
                warn!(
                    "Schedule window {} ended, forcing doctor {} offline",
                    schedule.window_label(),
                    self.doctor_id
                );
                self.availability.is_available = false;
                if !self.expired_prompt_fired {
                    self.prompts.push(SchedulePrompt::Expired);
                    self.expired_prompt_fired = true;
                }
                self.persist_availability(now).await;
            }
        }

        self.flush_pending_sync(now).await;
    }

    /// Capture the machine for persistence across restarts. Only the
    /// schedule, availability and timestamps travel; prompt bookkeeping is
    /// rebuilt from them.
    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            doctor_id: self.doctor_id,
            schedule: self.schedule.clone(),
            availability: self.availability,
            captured_at: self.clock.now(),
        }
    }

    /// Adopt a previously captured snapshot. Snapshots older than the
    /// 24-hour staleness window, or for another doctor, are rejected.
    pub fn restore(&mut self, snapshot: ScheduleSnapshot) -> Result<ScheduleState, SnapshotError> {
        let now = self.clock.now();

        if snapshot.doctor_id != self.doctor_id {
            return Err(SnapshotError::DoctorMismatch);
        }
        if snapshot.is_stale(now) {
            let age_hours = (now - snapshot.captured_at).num_hours();
            return Err(SnapshotError::Stale { age_hours });
        }

        self.schedule = snapshot.schedule;
        self.availability = snapshot.availability;
        self.reset_day_flags();
        // A restored window that already opened should not re-announce
        // itself as just started.
        if let Some(s) = &self.schedule {
            if s.in_window(now.time()) || s.expired_at(now.time()) {
                self.started_prompt_fired = true;
            }
        }
        self.rollover_if_needed(now);

        Ok(self.state_at(now))
    }

    fn rollover_if_needed(&mut self, now: DateTime<Utc>) {
        let stale_date = match &self.schedule {
            Some(s) if s.date != now.date_naive() => s.date,
            _ => return,
        };

        debug!(
            "Midnight rollover for doctor {}: clearing schedule for {}",
            self.doctor_id, stale_date
        );
        self.schedule = None;
        self.availability.is_available = false;
        self.reset_day_flags();
        self.prompts.push(SchedulePrompt::SetupRequired);
    }

    fn reset_day_flags(&mut self) {
        self.started_prompt_fired = false;
        self.ending_soon_fired = false;
        self.expired_prompt_fired = false;
    }

    fn recently_submitted(&self, schedule: &DailySchedule, now: DateTime<Utc>) -> bool {
        now - schedule.submitted_at <= Duration::hours(SNAPSHOT_TTL_HOURS)
    }

    async fn persist_schedule(&mut self, now: DateTime<Utc>) {
        let Some(schedule) = self.schedule.clone() else {
            return;
        };
        match self.store.save_schedule(self.doctor_id, &schedule).await {
            Ok(()) => {
                self.pending_sync = None;
            }
            Err(e) => self.record_sync_failure(SyncKind::Schedule, now, e),
        }
    }

    async fn persist_availability(&mut self, now: DateTime<Utc>) {
        let update = AvailabilityUpdate {
            is_available: self.availability.is_available,
            daily_schedule: self.schedule.clone(),
        };
        match self.store.save_availability(self.doctor_id, &update).await {
            Ok(()) => {
                // The availability payload carries the schedule too, so a
                // success here repairs any earlier failed write.
                self.pending_sync = None;
            }
            Err(e) => self.record_sync_failure(SyncKind::Availability, now, e),
        }
    }

    fn record_sync_failure(&mut self, kind: SyncKind, now: DateTime<Utc>, err: StoreError) {
        warn!(
            "Failed to sync {:?} for doctor {}: {}",
            kind, self.doctor_id, err
        );
        let kind = self
            .pending_sync
            .map(|p| p.kind.merge(kind))
            .unwrap_or(kind);
        // A fresh user action restarts the retry budget.
        self.pending_sync = Some(PendingSync {
            kind,
            attempts: 1,
            next_retry_at: now + Duration::seconds(SYNC_BACKOFF_BASE_SECONDS),
        });
        self.prompts.push(SchedulePrompt::SyncWarning {
            reason: err.to_string(),
        });
    }

    async fn flush_pending_sync(&mut self, now: DateTime<Utc>) {
        let Some(pending) = self.pending_sync else {
            return;
        };
        if pending.attempts >= MAX_SYNC_ATTEMPTS || now < pending.next_retry_at {
            return;
        }

        debug!(
            "Retrying deferred {:?} sync for doctor {} (attempt {})",
            pending.kind,
            self.doctor_id,
            pending.attempts + 1
        );

        let update = AvailabilityUpdate {
            is_available: self.availability.is_available,
            daily_schedule: self.schedule.clone(),
        };
        match self.store.save_availability(self.doctor_id, &update).await {
            Ok(()) => {
                info!("Deferred sync for doctor {} succeeded", self.doctor_id);
                self.pending_sync = None;
            }
            Err(e) => {
                let attempts = pending.attempts + 1;
                if attempts >= MAX_SYNC_ATTEMPTS {
                    warn!(
                        "Giving up on deferred sync for doctor {} after {} attempts: {}",
                        self.doctor_id, attempts, e
                    );
                } else {
                    warn!("Deferred sync retry failed for doctor {}: {}", self.doctor_id, e);
                }
                let delay =
                    Duration::seconds(SYNC_BACKOFF_BASE_SECONDS << attempts.min(4));
                self.pending_sync = Some(PendingSync {
                    kind: pending.kind,
                    attempts,
                    next_retry_at: now + delay,
                });
            }
        }
    }
}

fn validate_draft(
    draft: &ScheduleDraft,
    mode: SetupMode,
) -> Result<(NaiveTime, NaiveTime), ScheduleError> {
    let start = draft
        .start_time
        .ok_or_else(|| ScheduleError::InvalidTimeRange {
            reason: "a start time is required".to_string(),
        })?;
    let end = draft
        .end_time
        .ok_or_else(|| ScheduleError::InvalidTimeRange {
            reason: "an end time is required".to_string(),
        })?;

    if end <= start {
        return Err(ScheduleError::InvalidTimeRange {
            reason: format!(
                "end time {} must be after start time {}",
                end.format("%H:%M"),
                start.format("%H:%M")
            ),
        });
    }

    let minutes = (end - start).num_minutes();
    let required = mode.min_duration_minutes();
    if minutes < required {
        return Err(ScheduleError::DurationTooShort {
            required,
            actual: minutes,
        });
    }

    if let Some(break_time) = &draft.break_time {
        if break_time.enabled {
            validate_break(break_time, start, end)?;
        }
    }

    Ok((start, end))
}

fn validate_break(
    break_time: &BreakTime,
    start: NaiveTime,
    end: NaiveTime,
) -> Result<(), ScheduleError> {
    let inside = start <= break_time.start_time
        && break_time.start_time < break_time.end_time
        && break_time.end_time <= end;
    if !inside {
        return Err(ScheduleError::BreakOutsideWindow {
            window: window_label(start, end),
        });
    }
    Ok(())
}

fn minutes_to_end(schedule: &DailySchedule, time: NaiveTime) -> i64 {
    let mut delta = schedule.end_time - time;
    if delta < Duration::zero() {
        delta = delta + Duration::hours(24);
    }
    delta.num_minutes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MockAvailabilityStore;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeZone};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    fn permissive_store() -> MockAvailabilityStore {
        let mut store = MockAvailabilityStore::new();
        store.expect_save_schedule().returning(|_, _| Ok(()));
        store.expect_save_availability().returning(|_, _| Ok(()));
        store
            .expect_load_today_schedule()
            .returning(|_| Ok(None));
        store
    }

    fn controller_at(
        h: u32,
        m: u32,
    ) -> (
        ScheduleAvailabilityController<MockAvailabilityStore, ManualClock>,
        ManualClock,
    ) {
        let clock = ManualClock::at(at(h, m));
        let controller =
            ScheduleAvailabilityController::new(Uuid::new_v4(), permissive_store(), clock.clone());
        (controller, clock)
    }

    #[tokio::test]
    async fn rejects_missing_times() {
        let (mut c, _clock) = controller_at(8, 0);
        let draft = ScheduleDraft {
            start_time: Some(t(9, 0)),
            end_time: None,
            break_time: None,
        };
        assert_matches!(
            c.set_schedule(draft, SetupMode::Revision, false).await,
            Err(ScheduleError::InvalidTimeRange { .. })
        );
        assert!(c.schedule().is_none());
    }

    #[tokio::test]
    async fn rejects_end_before_start() {
        let (mut c, _clock) = controller_at(8, 0);
        let draft = ScheduleDraft::new(t(17, 0), t(9, 0));
        assert_matches!(
            c.set_schedule(draft, SetupMode::Revision, false).await,
            Err(ScheduleError::InvalidTimeRange { .. })
        );
    }

    #[tokio::test]
    async fn rejects_twenty_minute_span_and_keeps_previous_schedule() {
        let (mut c, _clock) = controller_at(8, 0);
        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();

        let err = c
            .set_schedule(ScheduleDraft::new(t(10, 0), t(10, 20)), SetupMode::Revision, true)
            .await
            .unwrap_err();
        assert_matches!(err, ScheduleError::DurationTooShort { required: 30, actual: 20 });

        let kept = c.schedule().unwrap();
        assert_eq!((kept.start_time, kept.end_time), (t(9, 0), t(17, 0)));
    }

    #[tokio::test]
    async fn initial_setup_requires_a_full_hour() {
        let (mut c, _clock) = controller_at(8, 0);
        assert_matches!(
            c.set_schedule(ScheduleDraft::new(t(9, 0), t(9, 45)), SetupMode::Initial, false)
                .await,
            Err(ScheduleError::DurationTooShort { required: 60, actual: 45 })
        );
        // The same span passes as a revision.
        assert!(c
            .set_schedule(ScheduleDraft::new(t(9, 0), t(9, 45)), SetupMode::Revision, false)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn rejects_break_outside_window() {
        let (mut c, _clock) = controller_at(8, 0);
        let draft = ScheduleDraft {
            start_time: Some(t(9, 0)),
            end_time: Some(t(17, 0)),
            break_time: Some(BreakTime {
                enabled: true,
                start_time: t(8, 0),
                end_time: t(8, 30),
            }),
        };
        assert_matches!(
            c.set_schedule(draft, SetupMode::Revision, false).await,
            Err(ScheduleError::BreakOutsideWindow { .. })
        );

        // Disabled breaks are not validated.
        let draft = ScheduleDraft {
            start_time: Some(t(9, 0)),
            end_time: Some(t(17, 0)),
            break_time: Some(BreakTime {
                enabled: false,
                start_time: t(8, 0),
                end_time: t(8, 30),
            }),
        };
        assert!(c.set_schedule(draft, SetupMode::Revision, true).await.is_ok());
    }

    #[tokio::test]
    async fn same_day_overwrite_needs_confirmation() {
        let (mut c, _clock) = controller_at(8, 0);
        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();

        assert_matches!(
            c.set_schedule(ScheduleDraft::new(t(10, 0), t(18, 0)), SetupMode::Revision, false)
                .await,
            Err(ScheduleError::ScheduleExists { .. })
        );

        c.set_schedule(ScheduleDraft::new(t(10, 0), t(18, 0)), SetupMode::Revision, true)
            .await
            .unwrap();
        assert_eq!(c.schedule().unwrap().start_time, t(10, 0));
    }

    #[tokio::test]
    async fn go_online_requires_schedule_and_window() {
        let (mut c, clock) = controller_at(8, 0);
        assert_matches!(c.go_online().await, Err(ScheduleError::NoScheduleSet));

        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();
        assert_matches!(
            c.go_online().await,
            Err(ScheduleError::OutsideScheduledHours { .. })
        );
        assert!(!c.is_online());

        clock.set(at(9, 5));
        assert_eq!(c.go_online().await.unwrap(), ScheduleState::Online);
        assert!(c.is_online());
    }

    #[tokio::test]
    async fn expiry_forces_offline_exactly_once() {
        let (mut c, clock) = controller_at(8, 50);
        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();
        clock.set(at(9, 5));
        c.go_online().await.unwrap();
        c.drain_prompts();

        clock.set(at(17, 0));
        c.tick().await;
        assert_eq!(c.state(), ScheduleState::Expired);
        assert!(!c.is_available());
        assert!(c.drain_prompts().contains(&SchedulePrompt::Expired));

        // Further ticks are idempotent: no second prompt, no state churn.
        clock.set(at(17, 1));
        c.tick().await;
        assert!(c.drain_prompts().is_empty());
        assert_eq!(c.state(), ScheduleState::Expired);
    }

    #[tokio::test]
    async fn extension_reopens_the_window() {
        let (mut c, clock) = controller_at(9, 5);
        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();
        c.go_online().await.unwrap();

        clock.set(at(17, 30));
        c.tick().await;
        assert_eq!(c.state(), ScheduleState::Expired);

        let state = c.extend(2).await.unwrap();
        assert_eq!(state, ScheduleState::Online);
        assert_eq!(c.schedule().unwrap().end_time, t(19, 0));
        assert!(c.is_available());

        // The extended window expires like any other.
        clock.set(at(19, 0));
        c.tick().await;
        assert_eq!(c.state(), ScheduleState::Expired);
        assert!(c.drain_prompts().contains(&SchedulePrompt::Expired));
    }

    #[tokio::test]
    async fn extension_wraps_past_midnight() {
        let (mut c, clock) = controller_at(9, 5);
        c.set_schedule(ScheduleDraft::new(t(9, 0), t(23, 0)), SetupMode::Revision, false)
            .await
            .unwrap();
        clock.set(at(23, 10));
        c.extend(2).await.unwrap();
        assert_eq!(c.schedule().unwrap().end_time, t(1, 0));
        assert_eq!(c.state(), ScheduleState::Online);
    }

    #[tokio::test]
    async fn ending_soon_fires_once() {
        let (mut c, clock) = controller_at(9, 5);
        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();
        c.go_online().await.unwrap();
        c.drain_prompts();

        clock.set(at(16, 50));
        c.tick().await;
        assert_matches!(
            c.drain_prompts().as_slice(),
            [SchedulePrompt::EndingSoon { minutes_left: 10 }]
        );

        clock.set(at(16, 55));
        c.tick().await;
        assert!(c.drain_prompts().is_empty());
    }

    #[tokio::test]
    async fn midnight_rollover_clears_the_day() {
        let (mut c, clock) = controller_at(9, 5);
        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();
        c.go_online().await.unwrap();
        c.drain_prompts();

        clock.set(Utc.with_ymd_and_hms(2025, 6, 3, 0, 1, 0).unwrap());
        c.tick().await;
        assert_eq!(c.state(), ScheduleState::NoSchedule);
        assert!(!c.is_available());
        assert!(c.drain_prompts().contains(&SchedulePrompt::SetupRequired));
    }

    #[tokio::test]
    async fn failed_save_keeps_local_state_and_warns() {
        let clock = ManualClock::at(at(9, 5));
        let mut store = MockAvailabilityStore::new();
        store
            .expect_save_schedule()
            .returning(|_, _| Err(StoreError::Unavailable("connection refused".to_string())));
        store
            .expect_save_availability()
            .returning(|_, _| Err(StoreError::Unavailable("connection refused".to_string())));
        let mut c =
            ScheduleAvailabilityController::new(Uuid::new_v4(), store, clock.clone());

        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();

        // Optimistic: the schedule is adopted even though the save failed.
        assert!(c.schedule().is_some());
        let prompts = c.drain_prompts();
        assert!(prompts
            .iter()
            .any(|p| matches!(p, SchedulePrompt::SyncWarning { .. })));
    }

    #[tokio::test]
    async fn deferred_sync_retries_after_backoff() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let clock = ManualClock::at(at(9, 5));
        let mut store = MockAvailabilityStore::new();
        // First availability write fails; the deferred retry succeeds.
        let calls = Arc::new(AtomicU32::new(0));
        let call_log = Arc::clone(&calls);
        store.expect_save_availability().returning(move |_, _| {
            if call_log.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StoreError::Unavailable("timeout".to_string()))
            } else {
                Ok(())
            }
        });
        store.expect_save_schedule().returning(|_, _| Ok(()));
        let mut c =
            ScheduleAvailabilityController::new(Uuid::new_v4(), store, clock.clone());

        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();
        c.go_online().await.unwrap();

        // Within the backoff window nothing is retried.
        c.tick().await;

        clock.set(at(9, 40));
        c.tick().await;
        assert!(!c.has_pending_sync());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn go_offline_returns_to_active_or_expired() {
        let (mut c, clock) = controller_at(9, 5);
        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();
        c.go_online().await.unwrap();

        // Still inside the window: back to active-but-offline.
        assert_eq!(c.go_offline().await, ScheduleState::ActiveOffline);

        c.go_online().await.unwrap();
        clock.set(at(17, 30));
        assert_eq!(c.go_offline().await, ScheduleState::Expired);
        assert!(!c.is_available());
    }

    #[tokio::test]
    async fn schedule_started_prompt_respects_recency_window() {
        let (mut c, clock) = controller_at(8, 50);
        c.set_schedule(ScheduleDraft::new(t(9, 0), t(17, 0)), SetupMode::Revision, false)
            .await
            .unwrap();
        c.drain_prompts();

        clock.set(at(9, 0));
        c.tick().await;
        assert_matches!(
            c.drain_prompts().as_slice(),
            [SchedulePrompt::ScheduleStarted { .. }]
        );

        // Only once.
        clock.set(at(9, 1));
        c.tick().await;
        assert!(c.drain_prompts().is_empty());
    }

    #[tokio::test]
    async fn stale_submission_does_not_reannounce() {
        let clock = ManualClock::at(at(8, 50));
        let mut c = ScheduleAvailabilityController::new(
            Uuid::new_v4(),
            permissive_store(),
            clock.clone(),
        );
        // A schedule submitted more than 24h ago (e.g. restored from a
        // server row) crosses its start silently.
        c.schedule = Some(DailySchedule {
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            start_time: t(9, 0),
            end_time: t(17, 0),
            is_active: true,
            break_time: None,
            submitted_at: at(8, 0) - Duration::days(2),
        });

        clock.set(at(9, 0));
        c.tick().await;
        assert!(c.drain_prompts().is_empty());
        assert_eq!(c.state(), ScheduleState::ActiveOffline);
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::DailySchedule;

/// Payload for mirroring availability to the backend. Carries the full
/// schedule so a deferred retry can repair both halves in one write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityUpdate {
    pub is_available: bool,
    #[serde(default)]
    pub daily_schedule: Option<DailySchedule>,
}

/// Remote persistence of the schedule and availability flag.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn load_today_schedule(
        &self,
        doctor_id: Uuid,
    ) -> Result<Option<DailySchedule>, StoreError>;

    async fn save_schedule(
        &self,
        doctor_id: Uuid,
        schedule: &DailySchedule,
    ) -> Result<(), StoreError>;

    async fn save_availability(
        &self,
        doctor_id: Uuid,
        update: &AvailabilityUpdate,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl<T> AvailabilityStore for std::sync::Arc<T>
where
    T: AvailabilityStore + ?Sized,
{
    async fn load_today_schedule(
        &self,
        doctor_id: Uuid,
    ) -> Result<Option<DailySchedule>, StoreError> {
        (**self).load_today_schedule(doctor_id).await
    }

    async fn save_schedule(
        &self,
        doctor_id: Uuid,
        schedule: &DailySchedule,
    ) -> Result<(), StoreError> {
        (**self).save_schedule(doctor_id, schedule).await
    }

    async fn save_availability(
        &self,
        doctor_id: Uuid,
        update: &AvailabilityUpdate,
    ) -> Result<(), StoreError> {
        (**self).save_availability(doctor_id, update).await
    }
}

#[derive(Debug, Default, Clone)]
struct StoredRecord {
    schedule: Option<DailySchedule>,
    is_available: bool,
}

/// In-process store used by tests and offline rehearsal runs.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Uuid, StoredRecord>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail, to exercise the optimistic-update
    /// path.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn seed_schedule(&self, doctor_id: Uuid, schedule: DailySchedule) {
        let mut records = self.records.lock().unwrap();
        records.entry(doctor_id).or_default().schedule = Some(schedule);
    }

    pub fn schedule_for(&self, doctor_id: Uuid) -> Option<DailySchedule> {
        let records = self.records.lock().unwrap();
        records.get(&doctor_id).and_then(|r| r.schedule.clone())
    }

    pub fn availability_for(&self, doctor_id: Uuid) -> Option<bool> {
        let records = self.records.lock().unwrap();
        records.get(&doctor_id).map(|r| r.is_available)
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store configured to fail".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AvailabilityStore for MemoryStore {
    async fn load_today_schedule(
        &self,
        doctor_id: Uuid,
    ) -> Result<Option<DailySchedule>, StoreError> {
        Ok(self.schedule_for(doctor_id))
    }

    async fn save_schedule(
        &self,
        doctor_id: Uuid,
        schedule: &DailySchedule,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut records = self.records.lock().unwrap();
        records.entry(doctor_id).or_default().schedule = Some(schedule.clone());
        Ok(())
    }

    async fn save_availability(
        &self,
        doctor_id: Uuid,
        update: &AvailabilityUpdate,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut records = self.records.lock().unwrap();
        let record = records.entry(doctor_id).or_default();
        record.is_available = update.is_available;
        if let Some(schedule) = &update.daily_schedule {
            record.schedule = Some(schedule.clone());
        }
        Ok(())
    }
}

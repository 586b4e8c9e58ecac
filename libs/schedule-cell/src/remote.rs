use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_backend::PortalApiClient;
use shared_models::error::PortalError;

use crate::error::StoreError;
use crate::models::{BreakTime, DailySchedule};
use crate::store::{AvailabilityStore, AvailabilityUpdate};

/// Availability store backed by the portal REST API.
pub struct HttpAvailabilityStore {
    api: PortalApiClient,
    auth_token: String,
}

impl HttpAvailabilityStore {
    pub fn new(api: PortalApiClient, auth_token: String) -> Self {
        Self { api, auth_token }
    }

    fn schedule_path(doctor_id: Uuid) -> String {
        format!("/api/v1/doctors/{}/today-schedule", doctor_id)
    }

    fn availability_path(doctor_id: Uuid) -> String {
        format!("/api/v1/doctors/{}/availability", doctor_id)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BreakTimeWire {
    enabled: bool,
    start_time: String,
    end_time: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TodayScheduleWire {
    start_time: String,
    end_time: String,
    is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    break_time: Option<BreakTimeWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// Times travel as "HH:MM"; older backend rows carry seconds too.
fn parse_wall_time(raw: &str) -> Result<NaiveTime, StoreError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| StoreError::Unavailable(format!("Bad wall-clock time '{}': {}", raw, e)))
}

fn format_wall_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn to_wire(schedule: &DailySchedule) -> TodayScheduleWire {
    TodayScheduleWire {
        start_time: format_wall_time(schedule.start_time),
        end_time: format_wall_time(schedule.end_time),
        is_active: schedule.is_active,
        break_time: schedule.break_time.as_ref().map(|b| BreakTimeWire {
            enabled: b.enabled,
            start_time: format_wall_time(b.start_time),
            end_time: format_wall_time(b.end_time),
        }),
        date: Some(schedule.date),
        updated_at: Some(schedule.submitted_at),
    }
}

fn from_wire(wire: TodayScheduleWire) -> Result<DailySchedule, StoreError> {
    let break_time = match wire.break_time {
        Some(b) => Some(BreakTime {
            enabled: b.enabled,
            start_time: parse_wall_time(&b.start_time)?,
            end_time: parse_wall_time(&b.end_time)?,
        }),
        None => None,
    };

    Ok(DailySchedule {
        date: wire.date.unwrap_or_else(|| Utc::now().date_naive()),
        start_time: parse_wall_time(&wire.start_time)?,
        end_time: parse_wall_time(&wire.end_time)?,
        is_active: wire.is_active,
        break_time,
        submitted_at: wire.updated_at.unwrap_or_else(Utc::now),
    })
}

fn map_error(err: PortalError) -> StoreError {
    match err {
        PortalError::Auth(msg) => StoreError::Unauthorized(msg),
        PortalError::NotFound(_) => StoreError::NotFound,
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl AvailabilityStore for HttpAvailabilityStore {
    async fn load_today_schedule(
        &self,
        doctor_id: Uuid,
    ) -> Result<Option<DailySchedule>, StoreError> {
        debug!("Loading today's schedule for doctor {}", doctor_id);

        let result: Result<TodayScheduleWire, PortalError> = self
            .api
            .request(
                Method::GET,
                &Self::schedule_path(doctor_id),
                Some(&self.auth_token),
                None,
            )
            .await;

        match result {
            Ok(wire) => Ok(Some(from_wire(wire)?)),
            Err(PortalError::NotFound(_)) => Ok(None),
            Err(e) => Err(map_error(e)),
        }
    }

    async fn save_schedule(
        &self,
        doctor_id: Uuid,
        schedule: &DailySchedule,
    ) -> Result<(), StoreError> {
        debug!(
            "Saving schedule {} for doctor {}",
            schedule.window_label(),
            doctor_id
        );

        let body = serde_json::to_value(to_wire(schedule))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        self.api
            .request_unit(
                Method::POST,
                &Self::schedule_path(doctor_id),
                Some(&self.auth_token),
                Some(body),
            )
            .await
            .map_err(map_error)
    }

    async fn save_availability(
        &self,
        doctor_id: Uuid,
        update: &AvailabilityUpdate,
    ) -> Result<(), StoreError> {
        debug!(
            "Saving availability={} for doctor {}",
            update.is_available, doctor_id
        );

        let daily_schedule = update
            .daily_schedule
            .as_ref()
            .map(|s| serde_json::to_value(to_wire(s)))
            .transpose()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let body = json!({
            "is_available": update.is_available,
            "daily_schedule": daily_schedule,
        });

        self.api
            .request_unit(
                Method::PATCH,
                &Self::availability_path(doctor_id),
                Some(&self.auth_token),
                Some(body),
            )
            .await
            .map_err(map_error)
    }
}

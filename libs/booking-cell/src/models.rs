use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_start_time: DateTime<Utc>,
    pub scheduled_end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub consultation_fee: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> i64 {
        (self.scheduled_end_time - self.scheduled_start_time).num_minutes()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub scheduled_start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Doctor card shown to patients when picking who to book with. The
/// backend omits fee and rating for doctors that have not been through
/// fee approval yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    #[serde(default)]
    pub consultation_fee: Option<f64>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl DoctorSummary {
    pub fn available(&self) -> bool {
        self.is_available.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl AppointmentFilter {
    pub(crate) fn to_query_parts(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(status) = &self.status {
            // Matches the serde wire spelling of the enum.
            let value = serde_json::to_value(status)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();
            parts.push(format!("status={}", value));
        }
        if let Some(from) = self.from {
            parts.push(format!("from={}", from.to_rfc3339()));
        }
        if let Some(to) = self.to {
            parts.push(format!("to={}", to.to_rfc3339()));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={}", limit));
        }
        parts
    }
}

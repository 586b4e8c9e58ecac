use chrono::Duration;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_backend::PortalApiClient;
use shared_models::error::PortalError;

use crate::models::{
    Appointment, AppointmentFilter, BookAppointmentRequest, DoctorSummary,
};

/// Appointment booking and doctor listing for the patient dashboard.
/// Plain request/response; all scheduling invariants live in the backend.
pub struct AppointmentClient {
    api: PortalApiClient,
    auth_token: String,
}

impl AppointmentClient {
    pub fn new(api: PortalApiClient, auth_token: String) -> Self {
        Self { api, auth_token }
    }

    pub async fn book_appointment(
        &self,
        request: &BookAppointmentRequest,
    ) -> Result<Appointment, PortalError> {
        if request.duration_minutes <= 0 {
            return Err(PortalError::Validation(
                "Appointment duration must be positive".to_string(),
            ));
        }

        debug!(
            "Booking appointment with doctor {} at {}",
            request.doctor_id, request.scheduled_start_time
        );

        let end_time =
            request.scheduled_start_time + Duration::minutes(request.duration_minutes);
        let body = json!({
            "doctor_id": request.doctor_id,
            "scheduled_start_time": request.scheduled_start_time.to_rfc3339(),
            "scheduled_end_time": end_time.to_rfc3339(),
            "duration_minutes": request.duration_minutes,
            "reason": request.reason,
        });

        self.api
            .request(
                Method::POST,
                "/api/v1/appointments",
                Some(&self.auth_token),
                Some(body),
            )
            .await
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Appointment, PortalError> {
        debug!("Cancelling appointment {}", appointment_id);

        let body = json!({ "reason": reason });
        self.api
            .request(
                Method::POST,
                &format!("/api/v1/appointments/{}/cancel", appointment_id),
                Some(&self.auth_token),
                Some(body),
            )
            .await
    }

    pub async fn patient_appointments(
        &self,
        patient_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, PortalError> {
        self.list_appointments(format!("patient_id={}", patient_id), filter)
            .await
    }

    pub async fn doctor_appointments(
        &self,
        doctor_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, PortalError> {
        self.list_appointments(format!("doctor_id={}", doctor_id), filter)
            .await
    }

    async fn list_appointments(
        &self,
        owner_part: String,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, PortalError> {
        let mut query_parts = vec![owner_part];
        query_parts.extend(filter.to_query_parts());

        let path = format!("/api/v1/appointments?{}", query_parts.join("&"));
        debug!("Fetching appointments: {}", path);

        self.api
            .request(Method::GET, &path, Some(&self.auth_token), None)
            .await
    }

    pub async fn list_doctors(
        &self,
        specialty: Option<&str>,
    ) -> Result<Vec<DoctorSummary>, PortalError> {
        let path = match specialty {
            Some(s) => format!("/api/v1/doctors?specialty={}", s),
            None => "/api/v1/doctors".to_string(),
        };

        self.api
            .request(Method::GET, &path, Some(&self.auth_token), None)
            .await
    }
}

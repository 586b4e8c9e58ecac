use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::{
    AppointmentClient, AppointmentFilter, AppointmentStatus, BookAppointmentRequest,
};
use shared_backend::PortalApiClient;
use shared_models::error::PortalError;

fn client_for(server: &MockServer) -> AppointmentClient {
    let api = PortalApiClient::with_base_url(&server.uri());
    AppointmentClient::new(api, "patient-token".to_string())
}

fn appointment_json(patient_id: Uuid, doctor_id: Uuid, status: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "scheduled_start_time": "2025-06-02T10:00:00Z",
        "scheduled_end_time": "2025-06-02T10:30:00Z",
        "status": status,
        "consultation_fee": 150.0,
        "created_at": "2025-06-01T09:00:00Z"
    })
}

#[tokio::test]
async fn books_an_appointment() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/api/v1/appointments"))
        .and(header("Authorization", "Bearer patient-token"))
        .and(body_partial_json(json!({
            "doctor_id": doctor_id,
            "duration_minutes": 30
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(appointment_json(patient_id, doctor_id, "pending")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = BookAppointmentRequest {
        doctor_id,
        scheduled_start_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
        duration_minutes: 30,
        reason: Some("follow-up".to_string()),
    };

    let appointment = client_for(&server).book_appointment(&request).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.duration_minutes(), 30);
}

#[tokio::test]
async fn rejects_non_positive_duration_before_any_request() {
    let server = MockServer::start().await;

    let request = BookAppointmentRequest {
        doctor_id: Uuid::new_v4(),
        scheduled_start_time: Utc::now(),
        duration_minutes: 0,
        reason: None,
    };

    let err = client_for(&server).book_appointment(&request).await.unwrap_err();
    assert_matches!(err, PortalError::Validation(_));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn lists_patient_appointments_with_status_filter() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments"))
        .and(query_param("patient_id", patient_id.to_string()))
        .and(query_param("status", "confirmed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_json(patient_id, Uuid::new_v4(), "confirmed")
        ])))
        .mount(&server)
        .await;

    let filter = AppointmentFilter {
        status: Some(AppointmentStatus::Confirmed),
        ..Default::default()
    };

    let appointments = client_for(&server)
        .patient_appointments(patient_id, &filter)
        .await
        .unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn cancelling_a_completed_appointment_surfaces_validation_error() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!("/api/v1/appointments/{}/cancel", appointment_id)))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "cannot cancel a completed appointment"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .cancel_appointment(appointment_id, Some("changed my mind"))
        .await
        .unwrap_err();
    assert_matches!(err, PortalError::Validation(_));
}

#[tokio::test]
async fn doctor_listing_tolerates_missing_optional_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/doctors"))
        .and(query_param("specialty", "cardiology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": Uuid::new_v4(),
                "full_name": "Dr. Imani Okafor",
                "specialty": "cardiology",
                "consultation_fee": 200.0,
                "rating": 4.8,
                "is_available": true
            },
            {
                // Not yet through fee approval: no fee, no rating.
                "id": Uuid::new_v4(),
                "full_name": "Dr. Lee Soo-jin",
                "specialty": "cardiology"
            }
        ])))
        .mount(&server)
        .await;

    let doctors = client_for(&server)
        .list_doctors(Some("cardiology"))
        .await
        .unwrap();

    assert_eq!(doctors.len(), 2);
    assert!(doctors[0].available());
    assert_eq!(doctors[1].consultation_fee, None);
    assert!(!doctors[1].available());
}

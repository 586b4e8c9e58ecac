use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_backend::PortalApiClient;
use shared_models::error::PortalError;

use crate::models::{FeeRequest, FeeRequestStatus};

/// Consultation-fee approval workflow: list what is waiting, approve, or
/// reject with a reason.
pub struct FeeApprovalClient {
    api: PortalApiClient,
    auth_token: String,
}

impl FeeApprovalClient {
    pub fn new(api: PortalApiClient, auth_token: String) -> Self {
        Self { api, auth_token }
    }

    pub async fn pending_requests(&self) -> Result<Vec<FeeRequest>, PortalError> {
        debug!("Fetching pending fee requests");

        self.api
            .request(
                Method::GET,
                "/api/v1/admin/fee-requests?status=pending",
                Some(&self.auth_token),
                None,
            )
            .await
    }

    pub async fn requests_with_status(
        &self,
        status: FeeRequestStatus,
    ) -> Result<Vec<FeeRequest>, PortalError> {
        let value = serde_json::to_value(status)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();

        self.api
            .request(
                Method::GET,
                &format!("/api/v1/admin/fee-requests?status={}", value),
                Some(&self.auth_token),
                None,
            )
            .await
    }

    pub async fn approve(&self, request_id: Uuid) -> Result<FeeRequest, PortalError> {
        info!("Approving fee request {}", request_id);

        self.api
            .request(
                Method::POST,
                &format!("/api/v1/admin/fee-requests/{}/approve", request_id),
                Some(&self.auth_token),
                None,
            )
            .await
    }

    pub async fn reject(
        &self,
        request_id: Uuid,
        reason: &str,
    ) -> Result<FeeRequest, PortalError> {
        if reason.trim().is_empty() {
            return Err(PortalError::Validation(
                "A rejection reason is required".to_string(),
            ));
        }

        info!("Rejecting fee request {}", request_id);

        self.api
            .request(
                Method::POST,
                &format!("/api/v1/admin/fee-requests/{}/reject", request_id),
                Some(&self.auth_token),
                Some(json!({ "reason": reason })),
            )
            .await
    }
}

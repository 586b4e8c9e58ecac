use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_backend::PortalApiClient;
use shared_models::auth::PortalUser;
use shared_models::error::PortalError;

use crate::models::UserFilter;

/// User administration for the admin dashboard. The backend enforces the
/// admin role on every route; this client just carries the bearer token.
pub struct UserAdminClient {
    api: PortalApiClient,
    auth_token: String,
}

impl UserAdminClient {
    pub fn new(api: PortalApiClient, auth_token: String) -> Self {
        Self { api, auth_token }
    }

    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<PortalUser>, PortalError> {
        let query_parts = filter.to_query_parts();
        let path = if query_parts.is_empty() {
            "/api/v1/admin/users".to_string()
        } else {
            format!("/api/v1/admin/users?{}", query_parts.join("&"))
        };
        debug!("Fetching users: {}", path);

        self.api
            .request(Method::GET, &path, Some(&self.auth_token), None)
            .await
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<PortalUser, PortalError> {
        self.api
            .request(
                Method::GET,
                &format!("/api/v1/admin/users/{}", user_id),
                Some(&self.auth_token),
                None,
            )
            .await
    }

    pub async fn set_user_enabled(
        &self,
        user_id: Uuid,
        enabled: bool,
    ) -> Result<PortalUser, PortalError> {
        info!("Setting user {} enabled={}", user_id, enabled);

        self.api
            .request(
                Method::PATCH,
                &format!("/api/v1/admin/users/{}", user_id),
                Some(&self.auth_token),
                Some(json!({ "is_enabled": enabled })),
            )
            .await
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), PortalError> {
        info!("Deleting user {}", user_id);

        self.api
            .request_unit(
                Method::DELETE,
                &format!("/api/v1/admin/users/{}", user_id),
                Some(&self.auth_token),
                None,
            )
            .await
    }
}

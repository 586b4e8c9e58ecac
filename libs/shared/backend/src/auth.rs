use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use shared_models::auth::Session;
use shared_models::error::PortalError;

use crate::client::PortalApiClient;

/// Exchange portal credentials for a bearer session.
pub async fn sign_in(
    api: &PortalApiClient,
    email: &str,
    password: &str,
) -> Result<Session, PortalError> {
    if email.is_empty() || password.is_empty() {
        return Err(PortalError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    debug!("Signing in as {}", email);

    let body = json!({
        "email": email,
        "password": password,
    });

    let session: Session = api
        .request(Method::POST, "/auth/login", None, Some(body))
        .await
        .map_err(|e| match e {
            // The backend answers bad credentials with 401; keep the reason
            // specific for the caller.
            PortalError::Auth(_) => PortalError::Auth("Invalid email or password".to_string()),
            other => other,
        })?;

    info!(
        "Signed in as {} ({:?})",
        session.user.display_name(),
        session.user.role
    );

    Ok(session)
}

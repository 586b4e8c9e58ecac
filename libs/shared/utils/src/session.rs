use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::debug;

use shared_models::auth::JwtClaims;
use shared_models::error::PortalError;

/// Decode the claims half of a bearer token without verifying the
/// signature. The backend holds the signing secret; the client only needs
/// to read expiry and identity to know when to prompt for re-auth.
pub fn decode_claims(token: &str) -> Result<JwtClaims, PortalError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(PortalError::Auth("Invalid token format".to_string()));
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(parts[1])
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| PortalError::Auth("Invalid claims encoding".to_string()))?;

    let claims: JwtClaims = serde_json::from_str(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        PortalError::Auth("Invalid claims format".to_string())
    })?;

    Ok(claims)
}

pub fn expires_at(claims: &JwtClaims) -> Option<DateTime<Utc>> {
    claims
        .exp
        .and_then(|exp| Utc.timestamp_opt(exp as i64, 0).single())
}

pub fn is_expired(claims: &JwtClaims, now: DateTime<Utc>) -> bool {
    match expires_at(claims) {
        Some(exp) => exp <= now,
        // No exp claim means the token never expires client-side.
        None => false,
    }
}

/// Check a raw token and produce the re-auth error the embedding layer
/// surfaces to the user.
pub fn ensure_fresh(token: &str, now: DateTime<Utc>) -> Result<JwtClaims, PortalError> {
    let claims = decode_claims(token)?;

    if is_expired(&claims, now) {
        return Err(PortalError::Auth(
            "Session expired, please sign in again".to_string(),
        ));
    }

    // Warn ahead of time so a long-running agent is not surprised mid-shift.
    if let Some(exp) = expires_at(&claims) {
        if exp - now < Duration::minutes(5) {
            debug!("Token for {} expires within 5 minutes", claims.sub);
        }
    }

    Ok(claims)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
    #[serde(other)]
    Unknown,
}

/// Verification state of a doctor account. The backend omits the field for
/// accounts that have never entered the verification pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub verification_status: Option<VerificationStatus>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PortalUser {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("Unknown")
    }

    /// An absent verification status means the account has not been
    /// reviewed yet.
    pub fn verification(&self) -> VerificationStatus {
        self.verification_status
            .unwrap_or(VerificationStatus::Pending)
    }

    /// Accounts default to enabled unless the backend says otherwise.
    pub fn enabled(&self) -> bool {
        self.is_enabled.unwrap_or(true)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: PortalUser,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.access_token
    }
}

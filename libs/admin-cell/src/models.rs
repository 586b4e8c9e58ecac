use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A doctor's request to charge (or change) their consultation fee,
/// reviewed from the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRequest {
    pub id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub doctor_name: Option<String>,
    pub requested_fee: f64,
    #[serde(default)]
    pub current_fee: Option<f64>,
    pub status: FeeRequestStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<shared_models::auth::Role>,
    pub search: Option<String>,
    pub limit: Option<u32>,
}

impl UserFilter {
    pub(crate) fn to_query_parts(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(role) = &self.role {
            let value = serde_json::to_value(role)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();
            parts.push(format!("role={}", value));
        }
        if let Some(search) = &self.search {
            parts.push(format!("search={}", search));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={}", limit));
        }
        parts
    }
}

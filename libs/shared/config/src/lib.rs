use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub portal_api_url: String,
    pub portal_email: String,
    pub portal_password: String,
    pub monitor_tick_seconds: u64,
    pub snapshot_path: String,
}

impl PortalConfig {
    pub fn from_env() -> Self {
        let config = Self {
            portal_api_url: env::var("PORTAL_API_URL")
                .unwrap_or_else(|_| {
                    warn!("PORTAL_API_URL not set, using empty value");
                    String::new()
                }),
            portal_email: env::var("PORTAL_EMAIL")
                .unwrap_or_else(|_| {
                    warn!("PORTAL_EMAIL not set, using empty value");
                    String::new()
                }),
            portal_password: env::var("PORTAL_PASSWORD")
                .unwrap_or_else(|_| {
                    warn!("PORTAL_PASSWORD not set, using empty value");
                    String::new()
                }),
            monitor_tick_seconds: env::var("MONITOR_TICK_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            snapshot_path: env::var("SNAPSHOT_PATH")
                .unwrap_or_else(|_| ".carepulse-agent.json".to_string()),
        };

        if !config.is_configured() {
            warn!("Agent not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.portal_api_url.is_empty()
            && !self.portal_email.is_empty()
            && !self.portal_password.is_empty()
    }
}

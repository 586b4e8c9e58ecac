use thiserror::Error;

/// Portal-wide error taxonomy.
///
/// `Validation` failures are resolved entirely on the client and never reach
/// the network. `Sync` failures are reported but non-fatal: local state has
/// already been applied optimistically by the time they surface.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl PortalError {
    /// Whether the caller should prompt the user to sign in again.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, PortalError::Auth(_))
    }
}

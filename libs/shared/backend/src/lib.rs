pub mod auth;
pub mod client;

pub use auth::sign_in;
pub use client::PortalApiClient;

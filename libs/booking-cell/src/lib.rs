pub mod client;
pub mod models;

pub use client::AppointmentClient;
pub use models::*;

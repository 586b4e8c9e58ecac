pub mod approvals;
pub mod models;
pub mod users;

pub use approvals::FeeApprovalClient;
pub use models::*;
pub use users::UserAdminClient;

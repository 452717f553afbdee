pub mod auth;
pub mod ownership;
pub mod response;

pub use auth::require_auth;
pub use ownership::ensure_owner;
pub use response::{ApiResponse, ApiResult};

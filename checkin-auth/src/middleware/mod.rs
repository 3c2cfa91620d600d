pub mod admin;
pub mod auth;
pub mod staff;

pub use admin::require_admin;
pub use auth::{auth_middleware, AuthUser};
pub use staff::{require_event_staff, EventScope};

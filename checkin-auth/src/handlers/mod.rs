pub mod auth;

pub use auth::{google_callback, google_login, logout, me, refresh};

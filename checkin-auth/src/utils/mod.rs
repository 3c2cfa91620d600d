pub mod cookies;

pub use cookies::{CookiePolicy, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

pub mod identity;
pub mod refresh_token;
pub mod role;

pub use identity::{AdminEntry, PendingLogin, ProviderProfile, TokenPair};
pub use refresh_token::RefreshTokenRecord;
pub use role::Role;

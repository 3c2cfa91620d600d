pub mod directory;
pub mod error;
pub mod jwt;
pub mod oauth;
pub mod oauth_state;
pub mod provider;
pub mod refresh_store;
pub mod role;
pub mod session;

pub use directory::{IdentityDirectory, InMemoryDirectory, PgDirectory};
pub use error::AuthError;
pub use jwt::{AccessClaims, JwtService, RefreshClaims, TokenClaims, TokenError};
pub use oauth::{LoginOutcome, OAuthService};
pub use oauth_state::{InMemoryStateStore, OAuthStateStore, RedisStateStore};
pub use provider::{GoogleEndpoints, GoogleProvider, IdentityProvider};
pub use refresh_store::{InMemoryRefreshTokenStore, PgRefreshTokenStore, RefreshTokenStore};
pub use role::RoleResolver;
pub use session::{RefreshOutcome, SessionService};

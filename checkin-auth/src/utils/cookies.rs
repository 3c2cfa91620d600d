use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

use crate::config::AuthConfig;
use crate::models::TokenPair;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Attributes shared by both session cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub same_site: SameSite,
    pub domain: Option<String>,
}

impl CookiePolicy {
    /// Prod scopes cookies to the web app's parent domain with `SameSite=Lax`;
    /// dev runs cross-site, so `SameSite=None` and host-only cookies.
    pub fn from_config(config: &AuthConfig) -> Self {
        if config.is_prod() {
            Self {
                same_site: SameSite::Lax,
                domain: reqwest::Url::parse(&config.web.web_url)
                    .ok()
                    .and_then(|url| url.host_str().and_then(parent_domain)),
            }
        } else {
            Self {
                same_site: SameSite::None,
                domain: None,
            }
        }
    }

    pub fn session_cookies(&self, tokens: &TokenPair) -> [Cookie<'static>; 2] {
        [
            self.build(
                ACCESS_TOKEN_COOKIE,
                tokens.access_token.clone(),
                to_offset(tokens.access_expires_at),
            ),
            self.build(
                REFRESH_TOKEN_COOKIE,
                tokens.refresh_token.clone(),
                to_offset(tokens.refresh_expires_at),
            ),
        ]
    }

    /// Empty-valued cookies already past their expiry, for logout.
    pub fn cleared_cookies(&self) -> [Cookie<'static>; 2] {
        [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE].map(|name| {
            let mut cookie = self.build(name, String::new(), OffsetDateTime::UNIX_EPOCH);
            cookie.set_max_age(time::Duration::ZERO);
            cookie
        })
    }

    fn build(&self, name: &'static str, value: String, expires: OffsetDateTime) -> Cookie<'static> {
        let mut cookie = Cookie::build((name, value))
            .http_only(true)
            .secure(true)
            .path("/")
            .same_site(self.same_site)
            .expires(expires)
            .build();

        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }
}

/// `app.example.com` -> `example.com`. Two-label hosts, IPs and `localhost`
/// have no shareable parent and stay host-only.
fn parent_domain(host: &str) -> Option<String> {
    if host.parse::<std::net::IpAddr>().is_ok() {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    match labels.len() {
        0 | 1 => None,
        2 => Some(host.to_string()),
        _ => Some(labels[1..].join(".")),
    }
}

fn to_offset(at: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(at.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

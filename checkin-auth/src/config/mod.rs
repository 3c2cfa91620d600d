use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub google: GoogleOAuthConfig,
    pub web: WebConfig,
    pub oauth: OAuthFlowConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

pub const MAX_ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 24 * 60;
pub const MAX_REFRESH_TOKEN_EXPIRY_DAYS: i64 = 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
    /// Refresh is refused while the access token has more than this left.
    pub rotation_window_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Public web front-end the service redirects to and scopes cookies for.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    pub web_url: String,
    pub sign_in_path: String,
    pub default_landing_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthFlowConfig {
    pub state_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;
        let api_url = get_env("API_URL", Some("http://localhost:8080"), is_prod)?;

        let config = AuthConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("checkin-auth"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            redis: RedisConfig {
                url: get_env("REDIS_URL", None, is_prod)?,
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", None, is_prod)?,
                access_token_expiry_minutes: parse_env(
                    "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                    "60",
                    is_prod,
                )?,
                refresh_token_expiry_days: parse_env(
                    "JWT_REFRESH_TOKEN_EXPIRY_DAYS",
                    "10",
                    is_prod,
                )?,
                rotation_window_minutes: parse_env("JWT_ROTATION_WINDOW_MINUTES", "5", is_prod)?,
            },
            google: GoogleOAuthConfig {
                client_id: get_env("GOOGLE_CLIENT_ID", None, is_prod)?,
                client_secret: get_env("GOOGLE_CLIENT_SECRET", None, is_prod)?,
                redirect_uri: format!("{}/auth/google/callback", api_url.trim_end_matches('/')),
            },
            web: WebConfig {
                web_url: get_env("WEB_URL", Some("http://localhost:3000"), is_prod)?
                    .trim_end_matches('/')
                    .to_string(),
                sign_in_path: get_env("SIGN_IN_PATH", Some("/auth/sign-in"), is_prod)?,
                default_landing_path: get_env("DEFAULT_LANDING_PATH", Some("/"), is_prod)?,
            },
            oauth: OAuthFlowConfig {
                state_ttl_seconds: parse_env("OAUTH_STATE_TTL_SECONDS", "600", is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.secret.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET must not be empty"
            )));
        }

        if !(1..=MAX_ACCESS_TOKEN_EXPIRY_MINUTES).contains(&self.jwt.access_token_expiry_minutes) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES must be between 1 and {}",
                MAX_ACCESS_TOKEN_EXPIRY_MINUTES
            )));
        }

        if !(1..=MAX_REFRESH_TOKEN_EXPIRY_DAYS).contains(&self.jwt.refresh_token_expiry_days) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_REFRESH_TOKEN_EXPIRY_DAYS must be between 1 and {}",
                MAX_REFRESH_TOKEN_EXPIRY_DAYS
            )));
        }

        if self.jwt.rotation_window_minutes < 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ROTATION_WINDOW_MINUTES must not be negative"
            )));
        }

        if self.oauth.state_ttl_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "OAUTH_STATE_TTL_SECONDS must be positive"
            )));
        }

        reqwest::Url::parse(&self.web.web_url).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("WEB_URL is not a valid URL: {}", e))
        })?;

        for path in [&self.web.sign_in_path, &self.web.default_landing_path] {
            if !path.starts_with('/') {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Redirect path '{}' must start with '/'",
                    path
                )));
            }
        }

        if self.environment == Environment::Prod
            && self.security.allowed_origins.iter().any(|o| o == "*")
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }

    pub fn is_prod(&self) -> bool {
        self.environment == Environment::Prod
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AuthConfig {
        AuthConfig {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "checkin-auth".to_string(),
            service_version: "test".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: "postgres://localhost/checkin".to_string(),
                max_connections: 5,
                min_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost".to_string(),
            },
            jwt: JwtConfig {
                secret: "secret".to_string(),
                access_token_expiry_minutes: 60,
                refresh_token_expiry_days: 10,
                rotation_window_minutes: 5,
            },
            google: GoogleOAuthConfig {
                client_id: "client".to_string(),
                client_secret: "shh".to_string(),
                redirect_uri: "http://localhost:8080/auth/google/callback".to_string(),
            },
            web: WebConfig {
                web_url: "https://app.example.com".to_string(),
                sign_in_path: "/auth/sign-in".to_string(),
                default_landing_path: "/".to_string(),
            },
            oauth: OAuthFlowConfig {
                state_ttl_seconds: 600,
            },
            security: SecurityConfig {
                allowed_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }

    #[test]
    fn sample_config_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_empty_secret() {
        let mut config = sample();
        config.jwt.secret = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_token_lifetimes_out_of_range() {
        let mut config = sample();
        config.jwt.refresh_token_expiry_days = 100_000_000;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.jwt.access_token_expiry_minutes = MAX_ACCESS_TOKEN_EXPIRY_MINUTES + 1;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.jwt.refresh_token_expiry_days = MAX_REFRESH_TOKEN_EXPIRY_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_relative_web_url() {
        let mut config = sample();
        config.web.web_url = "app.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_wildcard_origin_in_prod() {
        let mut config = sample();
        config.environment = Environment::Prod;
        config.security.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_environment_case_insensitively() {
        assert_eq!("PROD".parse::<Environment>(), Ok(Environment::Prod));
        assert!("staging".parse::<Environment>().is_err());
    }
}

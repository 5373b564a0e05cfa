/*
 * Responsibility
 * - Load environment / .env settings (listen addr, DATABASE_URL, CORS,
 *   device ceilings, subscription scan bounds, identity verification)
 * - Validate them up front (startup fails on missing / invalid values;
 *   the audit write bound must stay below the request timeout)
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use std::{env, fmt};

use crate::middleware::http::REQUEST_TIMEOUT;
use crate::services::{DeviceLimits, SubscriptionLookup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Local signature verification of bearer tokens.
#[derive(Clone, Debug)]
pub struct IdentityVerification {
    pub public_key_pem: String,
    pub issuer: String,
    pub audience: String,
    pub leeway_seconds: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    // None only in development: the in-memory backend is used instead.
    pub database_url: Option<String>,

    pub device_limits: DeviceLimits,
    pub subscription_lookup: SubscriptionLookup,
    pub audit_write_timeout: Duration,

    // None: claims are trusted verbatim (verified upstream).
    pub identity_verification: Option<IdentityVerification>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = parse_or(&get, "PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = get("APP_ENV")
            .map(|raw| AppEnv::parse(&raw))
            .unwrap_or(AppEnv::Development);

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let database_url = non_empty(get("DATABASE_URL"));
        if database_url.is_none() && app_env.is_production() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let device_limits = DeviceLimits {
            free: positive_or(&get, "FREE_TIER_DEVICE_LIMIT", 1)?,
            paid: positive_or(&get, "PAID_TIER_DEVICE_LIMIT", 5)?,
        };

        let subscription_lookup = SubscriptionLookup {
            page_size: positive_or(&get, "SUBSCRIPTION_PAGE_SIZE", 25)?,
            max_pages: positive_or(&get, "SUBSCRIPTION_MAX_PAGES", 20)?,
        };

        let audit_write_timeout =
            Duration::from_millis(positive_or(&get, "AUDIT_WRITE_TIMEOUT_MS", 2000)?);
        if audit_write_timeout >= REQUEST_TIMEOUT {
            return Err(ConfigError::Invalid("AUDIT_WRITE_TIMEOUT_MS"));
        }

        let identity_verification = match non_empty(get("IDENTITY_JWT_PUBLIC_KEY_PEM")) {
            Some(pem) => Some(IdentityVerification {
                public_key_pem: pem.replace("\\n", "\n"),
                issuer: non_empty(get("AUTH_ISSUER")).ok_or(ConfigError::Missing("AUTH_ISSUER"))?,
                audience: non_empty(get("AUTH_AUDIENCE"))
                    .ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?,
                leeway_seconds: parse_or(&get, "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?,
            }),
            None => None,
        };

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            database_url,
            device_limits,
            subscription_lookup,
            audit_write_timeout,
            identity_verification,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match non_empty(get(key)) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn positive_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
{
    let value = parse_or(get, key, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}

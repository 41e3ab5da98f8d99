//! Server configuration from environment variables.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use capstone_auth::Role;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Account created at startup (development/demo deployments).
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAccount {
    pub identifier: String,
    pub secret: String,
    pub role: Role,
    pub display_name: String,
}

impl core::fmt::Debug for SeedAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeedAccount")
            .field("identifier", &self.identifier)
            .field("role", &self.role)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Mark the refresh cookie `Secure`. Only disable for plain-HTTP local runs.
    pub cookie_secure: bool,
    pub seed_accounts: Vec<SeedAccount>,
}

impl core::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .field("seed_accounts", &self.seed_accounts)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            cookie_secure: true,
            seed_accounts: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => config.jwt_secret = secret,
            _ => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }

        if let Some(raw) = lookup("BIND_ADDR") {
            config.bind_addr = raw.parse().map_err(|e: std::net::AddrParseError| invalid("BIND_ADDR", &raw, e.to_string()))?;
        }
        if let Some(raw) = lookup("ACCESS_TOKEN_TTL_MINUTES") {
            config.access_token_ttl = Duration::minutes(positive("ACCESS_TOKEN_TTL_MINUTES", &raw)?);
        }
        if let Some(raw) = lookup("REFRESH_TOKEN_TTL_DAYS") {
            config.refresh_token_ttl = Duration::days(positive("REFRESH_TOKEN_TTL_DAYS", &raw)?);
        }
        if let Some(raw) = lookup("COOKIE_SECURE") {
            config.cookie_secure = raw
                .trim()
                .parse()
                .map_err(|_| invalid("COOKIE_SECURE", &raw, "expected true or false"))?;
        }
        if let Some(raw) = lookup("SEED_ACCOUNTS") {
            config.seed_accounts = parse_seed_accounts(&raw)?;
        }

        Ok(config)
    }
}

fn positive(key: &'static str, raw: &str) -> Result<i64, ConfigError> {
    let n: i64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| invalid(key, raw, e.to_string()))?;
    if n <= 0 {
        return Err(invalid(key, raw, "must be positive"));
    }
    Ok(n)
}

/// `identifier:secret:Role:Display Name;...`
fn parse_seed_accounts(raw: &str) -> Result<Vec<SeedAccount>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.splitn(4, ':').collect();
            match parts.as_slice() {
                [identifier, secret, role, display_name]
                    if !identifier.is_empty() && !secret.is_empty() && !role.is_empty() =>
                {
                    Ok(SeedAccount {
                        identifier: identifier.to_string(),
                        secret: secret.to_string(),
                        role: Role::new(role.to_string()),
                        display_name: display_name.to_string(),
                    })
                }
                _ => Err(invalid(
                    "SEED_ACCOUNTS",
                    identifier_only(entry),
                    "expected identifier:secret:Role:Display Name",
                )),
            }
        })
        .collect()
}

/// Never echo a secret back in an error.
fn identifier_only(entry: &str) -> &str {
    entry.split(':').next().unwrap_or_default()
}

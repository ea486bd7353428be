use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Server settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub token_ttl_hours: i64,
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://todo.db".to_string(),
            jwt_secret: DEV_SECRET.to_string(),
            host: "0.0.0.0".to_string(),
            port: 3001,
            token_ttl_hours: 24,
            cors_origins: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let jwt_secret = lookup("JWT_SECRET")
            .or_else(|| lookup("SECRET_KEY"))
            .filter(|secret| !secret.trim().is_empty())
            .unwrap_or_else(|| {
                warn!("JWT_SECRET not set, using development secret");
                defaults.jwt_secret.clone()
            });

        let cors_origins = lookup("CORS_ORIGINS").and_then(|raw| {
            let origins: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
            (!origins.is_empty()).then_some(origins)
        });

        let token_ttl_hours = parse_or(&lookup, "TOKEN_TTL_HOURS", defaults.token_ttl_hours)?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "TOKEN_TTL_HOURS".to_string(),
                message: "must be positive".to_string(),
            });
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            jwt_secret,
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            token_ttl_hours,
            cors_origins,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub(crate) fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.database_url, "sqlite://todo.db");
        assert!(config.cors_origins.is_none());
    }

    #[test]
    fn secret_key_is_a_fallback_for_jwt_secret() {
        let config = Config::from_lookup(lookup_from(&[("SECRET_KEY", "legacy")])).unwrap();
        assert_eq!(config.jwt_secret, "legacy");

        let config = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", "legacy"),
            ("JWT_SECRET", "primary"),
        ]))
        .unwrap();
        assert_eq!(config.jwt_secret, "primary");
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = Config::from_lookup(lookup_from(&[(
            "CORS_ORIGINS",
            "http://localhost:5173, http://localhost:3000,",
        )]))
        .unwrap();
        assert_eq!(
            config.cors_origins,
            Some(vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string()
            ])
        );
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PORT"));
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("TOKEN_TTL_HOURS", "0")])).is_err());
    }
}

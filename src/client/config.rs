use std::{env, path::PathBuf, time::Duration};

use reqwest::Url;

use super::error::ClientError;
use crate::config::parse_or;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub page_size: u32,
    /// Where credentials persist between runs; `None` keeps them in memory.
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001".to_string(),
            timeout: Duration::from_secs(10),
            page_size: 6,
            session_file: None,
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Result<Self, ClientError> {
        let config = Self {
            api_url: api_url.into(),
            ..Self::default()
        };
        config.validate()
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let invalid = |e: crate::config::ConfigError| ClientError::InvalidConfig(e.to_string());

        let timeout_secs = parse_or(&lookup, "TODO_API_TIMEOUT_SECS", defaults.timeout.as_secs())
            .map_err(invalid)?;

        let config = Self {
            api_url: lookup("TODO_API_URL").unwrap_or(defaults.api_url),
            timeout: Duration::from_secs(timeout_secs),
            page_size: parse_or(&lookup, "TODO_PAGE_SIZE", defaults.page_size).map_err(invalid)?,
            session_file: lookup("TODO_SESSION_FILE").map(PathBuf::from),
        };
        config.validate()
    }

    fn validate(mut self) -> Result<Self, ClientError> {
        Url::parse(&self.api_url)
            .map_err(|e| ClientError::InvalidConfig(format!("API URL {}: {e}", self.api_url)))?;
        if self.page_size == 0 {
            return Err(ClientError::InvalidConfig(
                "page size must be positive".to_string(),
            ));
        }
        self.api_url = self.api_url.trim_end_matches('/').to_string();
        Ok(self)
    }
}

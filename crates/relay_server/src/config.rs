use std::str::FromStr;
use std::time::Duration;

use relay_engine::{UpstreamSettings, WorkflowRoutes, SETUP_WITH_KEYWORDS};
use relay_logging::{LevelFilter, LogDestination};
use thiserror::Error;

/// Workflow kind routed to `RELAY_WEBHOOK_ARTICLE_GENERATION` when configured.
pub const ARTICLE_GENERATION: &str = "articleGeneration";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Relay process settings, read from the environment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_host: String,
    pub port: u16,
    pub webhook_default: String,
    pub webhook_setup_with_keywords: String,
    pub webhook_article_generation: Option<String>,
    pub upstream: UpstreamSettings,
    pub max_upload_bytes: usize,
    pub log_destination: LogDestination,
    pub log_level: LevelFilter,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3001,
            webhook_default: "http://localhost:5678/webhook/setup-without-keywords".to_string(),
            webhook_setup_with_keywords: "http://localhost:5678/webhook/setup-with-keywords"
                .to_string(),
            webhook_article_generation: None,
            upstream: UpstreamSettings::default(),
            max_upload_bytes: 25 * 1024 * 1024,
            log_destination: LogDestination::Terminal,
            log_level: LevelFilter::Info,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let connect_secs = parse_or(
            "RELAY_CONNECT_TIMEOUT_SECS",
            get("RELAY_CONNECT_TIMEOUT_SECS"),
            "a number of seconds",
            defaults.upstream.connect_timeout.as_secs(),
        )?;
        let request_secs = parse_or(
            "RELAY_REQUEST_TIMEOUT_SECS",
            get("RELAY_REQUEST_TIMEOUT_SECS"),
            "a number of seconds",
            defaults.upstream.request_timeout.as_secs(),
        )?;

        Ok(Self {
            bind_host: get("RELAY_BIND_HOST").unwrap_or(defaults.bind_host),
            port: parse_or("PORT", get("PORT"), "a port number", defaults.port)?,
            webhook_default: get("RELAY_WEBHOOK_DEFAULT").unwrap_or(defaults.webhook_default),
            webhook_setup_with_keywords: get("RELAY_WEBHOOK_SETUP_WITH_KEYWORDS")
                .unwrap_or(defaults.webhook_setup_with_keywords),
            webhook_article_generation: get("RELAY_WEBHOOK_ARTICLE_GENERATION"),
            upstream: UpstreamSettings {
                connect_timeout: Duration::from_secs(connect_secs),
                request_timeout: Duration::from_secs(request_secs),
                max_bytes: parse_or(
                    "RELAY_MAX_RESPONSE_BYTES",
                    get("RELAY_MAX_RESPONSE_BYTES"),
                    "a byte count",
                    defaults.upstream.max_bytes,
                )?,
            },
            max_upload_bytes: parse_or(
                "RELAY_MAX_UPLOAD_BYTES",
                get("RELAY_MAX_UPLOAD_BYTES"),
                "a byte count",
                defaults.max_upload_bytes,
            )?,
            log_destination: parse_or(
                "RELAY_LOG",
                get("RELAY_LOG"),
                "one of terminal, file, both",
                defaults.log_destination,
            )?,
            log_level: parse_or(
                "RELAY_LOG_LEVEL",
                get("RELAY_LOG_LEVEL"),
                "a log level",
                defaults.log_level,
            )?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn routes(&self) -> WorkflowRoutes {
        let routes = WorkflowRoutes::new(self.webhook_default.clone())
            .with_route(SETUP_WITH_KEYWORDS, self.webhook_setup_with_keywords.clone());
        match &self.webhook_article_generation {
            Some(url) => routes.with_route(ARTICLE_GENERATION, url.clone()),
            None => routes,
        }
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}

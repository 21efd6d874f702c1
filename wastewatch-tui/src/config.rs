//! Command line flags and layered settings.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, `WASTEWATCH_*` environment
//! variables, command line flags.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use wastewatch_api::DEFAULT_BASE_URL;
use wastewatch_core::telemetry::DEFAULT_POLL_INTERVAL;
use wastewatch_osrm::DEFAULT_SERVICE_URL;

const DEFAULT_CONFIG_FILE: &str = "wastewatch.toml";
const DEFAULT_LOG_FILE: &str = "/tmp/wastewatch.log";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Terminal dashboard for waste collection points, routes and server health.
#[derive(Parser, Debug, Default, Serialize)]
#[command(name = "wastewatch", version, about)]
pub(crate) struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, env = "WASTEWATCH_CONFIG")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Backend base URL (e.g. http://localhost:8086/api)
    #[arg(short = 'u', long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// OSRM route service URL
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_url: Option<String>,

    /// Seconds between server health samples
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Log in as this user on startup
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Log file path
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    #[serde(skip)]
    pub verbose: u8,
}

/// Resolved settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub api_url: String,
    pub routing_url: String,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
    /// Pre-issued bearer token; ignored when a login is configured.
    #[serde(deserialize_with = "secret")]
    pub token: Option<SecretString>,
    pub username: Option<String>,
    #[serde(deserialize_with = "secret")]
    pub password: Option<SecretString>,
    pub log_file: PathBuf,
    pub verbose: u8,
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_owned(),
            routing_url: DEFAULT_SERVICE_URL.to_owned(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token: None,
            username: None,
            password: None,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            verbose: 0,
        }
    }
}

impl Settings {
    /// Layer the config file, environment and flags over the defaults.
    pub(crate) fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("WASTEWATCH_").ignore(&["config"]))
            .merge(Serialized::globals(cli));
        let mut settings = Self::from_figment(&figment)?;
        settings.verbose = settings.verbose.max(cli.verbose);
        Ok(settings)
    }

    fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let settings: Self = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "poll_interval_secs",
                reason: "must be at least one second",
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "timeout_secs",
                reason: "must be at least one second",
            });
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(ConfigError::Validation {
                field: "username",
                reason: "username and password must be given together",
            });
        }
        Ok(())
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Username and password, when both are configured.
    pub(crate) fn credentials(&self) -> Option<(&str, &SecretString)> {
        self.username.as_deref().zip(self.password.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn layered(toml: &str, cli: &Cli) -> Result<Settings, ConfigError> {
        let figment = Figment::new()
            .merge(Toml::string(toml))
            .merge(Serialized::globals(cli));
        Settings::from_figment(&figment)
    }

    #[test]
    fn defaults_point_at_local_backend() {
        let settings = layered("", &Cli::default()).expect("defaults are valid");

        assert_eq!(settings.api_url, "http://localhost:8086/api");
        assert_eq!(settings.poll_interval(), Duration::from_secs(5));
        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert!(settings.credentials().is_none(), "no login by default");
    }

    #[test]
    fn flags_override_file() {
        let cli = Cli {
            api_url: Some("http://backend:9000/api".to_owned()),
            ..Cli::default()
        };
        let toml = r#"
            api_url = "http://file:8086/api"
            poll_interval_secs = 10
            verbose = 2
            token = "abc"
        "#;

        let settings = layered(toml, &cli).expect("valid settings");

        assert_eq!(settings.api_url, "http://backend:9000/api");
        assert_eq!(settings.poll_interval_secs, 10);
        assert_eq!(settings.verbose, 2);
        assert_eq!(
            settings.token.as_ref().map(|token| token.expose_secret().to_owned()),
            Some("abc".to_owned())
        );
    }

    #[test]
    fn login_needs_both_halves() {
        let cli = Cli {
            username: Some("ops".to_owned()),
            ..Cli::default()
        };

        let err = layered("", &cli).expect_err("password missing");
        assert!(matches!(err, ConfigError::Validation { field: "username", .. }));

        let settings = layered(r#"password = "hunter2""#, &cli).expect("complete login");
        assert_eq!(settings.credentials().map(|(user, _)| user), Some("ops"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = layered("poll_interval_secs = 0", &Cli::default()).expect_err("zero interval");
        assert!(matches!(err, ConfigError::Validation { field: "poll_interval_secs", .. }));
    }
}

//! Application configuration

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use serde_with::serde_as;
use tracing::warn;

use crate::errors::{IssRecorderError, Result};

pub const DEFAULT_URL: &str = "http://api.open-notify.org/iss-now.json";
pub const DEFAULT_CONFIG_FILE: &str = "config/default";
const ENV_PREFIX: &str = "ISSRECORDER";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub fetcher: FetcherConfig,
    pub database: DatabaseConfig,
    pub poller: PollerConfig,
    pub sink: SinkConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct FetcherConfig {
    pub url: String,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub timeout: Duration,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub dbname: String,
    /// Full connection string, overrides host/port/user/dbname
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    pub mode: PollModeKind,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub interval: Duration,
    /// Stop continuous mode after this many cycles
    #[serde(default)]
    pub max_cycles: Option<u64>,
    pub retry: RetryConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Consecutive failed cycles tolerated before giving up; 0 = fail fast
    pub max_consecutive_failures: u32,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub initial_backoff: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub max_backoff: Duration,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PollModeKind {
    Once,
    Continuous,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub format: OutputFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Database,
    Console,
}

/// Console output format
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Wkt,
    Json,
}

/// Values given on the command line, applied on top of all other sources
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub once: bool,
    pub interval: Option<u64>,
    pub sink: Option<SinkKind>,
    pub format: Option<OutputFormat>,
}

impl AppConfig {
    /// Load from defaults, `config/default.*` and the environment
    pub fn load() -> Result<Self> {
        Self::load_with(None, &Overrides::default())
    }

    /// Load with an explicit configuration file and command-line overrides
    pub fn load_with(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = Self::defaults()?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = Self::apply_overrides(builder, overrides)?
            .build()?
            .try_deserialize()?;
        config.validate()?;

        let shadowed = config.shadowed_overrides(overrides);
        if !shadowed.is_empty() {
            warn!(
                "database.url is set, ignoring command line {}",
                shadowed.join(" and ")
            );
        }
        Ok(config)
    }

    /// Command-line database flags that have no effect because an explicit
    /// `database.url` takes precedence
    pub fn shadowed_overrides(&self, overrides: &Overrides) -> Vec<&'static str> {
        if self.database.url.is_none() {
            return Vec::new();
        }
        let mut shadowed = Vec::new();
        if overrides.host.is_some() {
            shadowed.push("--host");
        }
        if overrides.port.is_some() {
            shadowed.push("--port");
        }
        shadowed
    }

    fn defaults() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("fetcher.url", DEFAULT_URL)?
            .set_default("fetcher.timeout", 10)?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432)?
            .set_default("database.user", "postgres")?
            .set_default("database.dbname", "postgres")?
            .set_default("database.max_connections", 1)?
            .set_default("poller.mode", "continuous")?
            .set_default("poller.interval", 5)?
            .set_default("poller.retry.max_consecutive_failures", 0)?
            .set_default("poller.retry.initial_backoff", 1)?
            .set_default("poller.retry.max_backoff", 60)?
            .set_default("sink.kind", "database")?
            .set_default("sink.format", "wkt")
    }

    fn apply_overrides(
        builder: ConfigBuilder<DefaultState>,
        overrides: &Overrides,
    ) -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        let mut builder = builder
            .set_override_option("database.host", overrides.host.clone())?
            .set_override_option("database.port", overrides.port.map(i64::from))?
            .set_override_option(
                "poller.interval",
                overrides
                    .interval
                    .map(|secs| i64::try_from(secs).unwrap_or(i64::MAX)),
            )?
            .set_override_option("sink.kind", overrides.sink.map(SinkKind::as_str))?
            .set_override_option("sink.format", overrides.format.map(OutputFormat::as_str))?;
        if overrides.once {
            builder = builder.set_override("poller.mode", "once")?;
        }
        Ok(builder)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.fetcher.validate()?;
        self.database.validate()?;
        self.poller.validate()?;
        Ok(())
    }
}

fn invalid(message: &str) -> IssRecorderError {
    IssRecorderError::ConfigurationError {
        message: message.to_string(),
    }
}

impl FetcherConfig {
    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(invalid("Fetcher URL cannot be empty"));
        }
        if self.timeout.is_zero() {
            return Err(invalid("Request timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(invalid("Database max_connections must be greater than zero"));
        }
        if self.url.is_some() {
            return Ok(());
        }
        if self.host.trim().is_empty() {
            return Err(invalid("Database host cannot be empty"));
        }
        if self.port == 0 {
            return Err(invalid("Database port must be greater than zero"));
        }
        Ok(())
    }

    /// Connection string, `postgres://<user>@<host>:<port>/<dbname>` unless
    /// an explicit URL is configured
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}@{}:{}/{}",
                self.user, self.host, self.port, self.dbname
            ),
        }
    }
}

impl PollerConfig {
    fn validate(&self) -> Result<()> {
        if self.mode == PollModeKind::Continuous && self.interval.is_zero() {
            return Err(invalid("Poll interval must be greater than zero"));
        }
        if self.max_cycles == Some(0) {
            return Err(invalid("max_cycles must be greater than zero"));
        }
        if self.retry.max_consecutive_failures > 0 && self.retry.initial_backoff.is_zero() {
            return Err(invalid("Initial backoff must be greater than zero"));
        }
        if self.retry.max_backoff < self.retry.initial_backoff {
            return Err(invalid("Maximum backoff cannot be below initial backoff"));
        }
        Ok(())
    }
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::Database => "database",
            SinkKind::Console => "console",
        }
    }
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Wkt => "wkt",
            OutputFormat::Json => "json",
        }
    }
}

//! Server configuration management
//!
//! Handles loading configuration from TOML files, `LENDING_*` environment variables,
//! and CLI arguments.

use lending_core::types::{BorrowerId, InvestorId};
use lending_engine::config::{EngineConfig, DEFAULT_AGREEMENT_LETTER_BASE, DEFAULT_PROOF_BASE};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid environment: {0}. Must be one of: development, staging, production")]
    InvalidEnvironment(String),

    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Environment variable {name} error: {message}")]
    EnvError { name: String, message: String },

    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Log levels supported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }
}

impl Environment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Server configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Log level
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// Environment (development, staging, production)
    #[serde(deserialize_with = "deserialize_environment")]
    pub environment: Environment,
    /// Seconds to wait for the event consumer to drain on shutdown
    pub shutdown_timeout_secs: u64,
    /// Whether agreement letters are mailed when a loan is funded
    pub notifier_enabled: bool,
    /// Deadline for each ledger, notifier and event-sink call; 0 disables it
    pub dependency_timeout_ms: u64,
    /// Capacity of the lifecycle event channel
    pub event_channel_capacity: usize,
    /// Audit trail entries to retain
    pub audit_max_entries: usize,
    /// Base URL for issued agreement letters
    pub agreement_letter_base: String,
    /// Base URL for issued field validator proofs
    pub proof_base: String,
    /// Registered borrowers
    pub borrowers: Vec<BorrowerId>,
    /// Registered investors
    pub investors: Vec<InvestorId>,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

fn deserialize_environment<'de, D>(deserializer: D) -> Result<Environment, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Environment::from_str(&s).map_err(serde::de::Error::custom)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: LogLevel::Info,
            environment: Environment::Development,
            shutdown_timeout_secs: 30,
            notifier_enabled: true,
            dependency_timeout_ms: 5_000,
            event_channel_capacity: 1024,
            audit_max_entries: 100_000,
            agreement_letter_base: DEFAULT_AGREEMENT_LETTER_BASE.to_string(),
            proof_base: DEFAULT_PROOF_BASE.to_string(),
            borrowers: (1..=3).collect(),
            investors: (1..=10).collect(),
        }
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::EnvError {
        name: name.to_string(),
        message: e.to_string(),
    })
}

fn parse_id_list(name: &str, value: &str) -> Result<Vec<i64>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_env(name, s))
        .collect()
}

impl ServerConfig {
    /// Create a new ServerConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))
    }

    /// Override fields from `LENDING_*` variables found through `lookup`.
    ///
    /// List variables (`LENDING_BORROWERS`, `LENDING_INVESTORS`) are comma-separated.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("LENDING_SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("LENDING_SERVER_PORT") {
            self.port = parse_env("LENDING_SERVER_PORT", &port)?;
        }
        if let Some(level) = lookup("LENDING_LOG_LEVEL") {
            self.log_level = LogLevel::from_str(&level)?;
        }
        if let Some(env) = lookup("LENDING_ENV") {
            self.environment = Environment::from_str(&env)?;
        }
        if let Some(secs) = lookup("LENDING_SHUTDOWN_TIMEOUT_SECS") {
            self.shutdown_timeout_secs = parse_env("LENDING_SHUTDOWN_TIMEOUT_SECS", &secs)?;
        }
        if let Some(enabled) = lookup("LENDING_NOTIFIER_ENABLED") {
            self.notifier_enabled = parse_env("LENDING_NOTIFIER_ENABLED", &enabled.to_lowercase())?;
        }
        if let Some(ms) = lookup("LENDING_DEPENDENCY_TIMEOUT_MS") {
            self.dependency_timeout_ms = parse_env("LENDING_DEPENDENCY_TIMEOUT_MS", &ms)?;
        }
        if let Some(capacity) = lookup("LENDING_EVENT_CHANNEL_CAPACITY") {
            self.event_channel_capacity = parse_env("LENDING_EVENT_CHANNEL_CAPACITY", &capacity)?;
        }
        if let Some(base) = lookup("LENDING_AGREEMENT_LETTER_BASE") {
            self.agreement_letter_base = base;
        }
        if let Some(base) = lookup("LENDING_PROOF_BASE") {
            self.proof_base = base;
        }
        if let Some(ids) = lookup("LENDING_BORROWERS") {
            self.borrowers = parse_id_list("LENDING_BORROWERS", &ids)?;
        }
        if let Some(ids) = lookup("LENDING_INVESTORS") {
            self.investors = parse_id_list("LENDING_INVESTORS", &ids)?;
        }
        Ok(())
    }

    /// Validate the configuration, reporting every problem at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("port must be between 1 and 65535".to_string());
        }
        if self.host.parse::<IpAddr>().is_err() {
            errors.push(format!("host '{}' is not an IP address", self.host));
        }
        if self.event_channel_capacity == 0 {
            errors.push("event_channel_capacity must be greater than 0".to_string());
        }
        if self.audit_max_entries == 0 {
            errors.push("audit_max_entries must be greater than 0".to_string());
        }
        for (name, base) in [
            ("agreement_letter_base", &self.agreement_letter_base),
            ("proof_base", &self.proof_base),
        ] {
            if !base.starts_with("http://") && !base.starts_with("https://") {
                errors.push(format!(
                    "Invalid {} '{}'. Must start with http:// or https://",
                    name, base
                ));
            }
        }
        if let Some(id) = self.borrowers.iter().chain(&self.investors).find(|id| **id <= 0) {
            errors.push(format!("registered ids must be positive, found {}", id));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::Invalid(vec![format!("host '{}' is not an IP address", self.host)]))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Engine settings derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            dependency_timeout: (self.dependency_timeout_ms > 0)
                .then(|| Duration::from_millis(self.dependency_timeout_ms)),
            agreement_letter_base: self.agreement_letter_base.clone(),
            proof_base: self.proof_base.clone(),
        }
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = LogLevel::from_str(log_level)?;
        }
        if cli.disable_notifier {
            self.notifier_enabled = false;
        }
        Ok(())
    }
}

/// CLI arguments structure
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Host address override
    pub host: Option<String>,
    /// Port override
    pub port: Option<u16>,
    /// Log level override
    pub log_level: Option<String>,
    /// Turn agreement-letter mailing off
    pub disable_notifier: bool,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<ServerConfig, ConfigError> {
    build_config_with(cli, |name| std::env::var(name).ok())
}

/// [`build_config`] with an explicit environment lookup
pub fn build_config_with(
    cli: &CliArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ServerConfig, ConfigError> {
    let mut config = match &cli.config_file {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    config.apply_env(lookup)?;
    config.merge_with_cli(cli)?;
    config.validate()?;

    Ok(config)
}

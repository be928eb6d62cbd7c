//! # Configuration Management
//!
//! Client configuration for X protocol sessions.
//!
//! ## Configuration Sources
//! - TOML files via [`Config::from_file`]
//! - `MYSQLX_*` environment variables via [`Config::from_env`]
//! - Direct instantiation with defaults and closures over them
//!
//! Durations are written as integer milliseconds.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Port the X plugin listens on by default.
pub const DEFAULT_PORT: u16 = 33060;

/// Largest frame payload accepted by default (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = crate::core::frame::MAX_PAYLOAD_SIZE;

/// Top-level configuration: session options plus logging.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| Error::Config(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden by `MYSQLX_*` environment variables.
    ///
    /// A variable that is set but does not parse is an error rather than
    /// being silently ignored.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(ms) = env_parse::<u64>("MYSQLX_CONNECT_TIMEOUT_MS")? {
            config.client.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("MYSQLX_READ_TIMEOUT_MS")? {
            config.client.read_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("MYSQLX_WRITE_TIMEOUT_MS")? {
            config.client.write_timeout = Duration::from_millis(ms);
        }
        if let Some(size) = env_parse::<usize>("MYSQLX_MAX_FRAME_SIZE")? {
            config.client.max_frame_size = size;
        }
        if let Some(mode) = env_parse::<TlsMode>("MYSQLX_TLS_MODE")? {
            config.client.tls_mode = mode;
        }
        if let Some(verify) = env_parse::<bool>("MYSQLX_TLS_VERIFY")? {
            config.client.tls_verify = verify;
        }
        if let Some(method) = env_parse::<AuthMethod>("MYSQLX_AUTH_METHOD")? {
            config.client.auth_method = method;
        }
        if let Some(fetch) = env_parse::<bool>("MYSQLX_FETCH_SERVER_VERSION")? {
            config.client.fetch_server_version = fetch;
        }
        if let Ok(schema) = std::env::var("MYSQLX_SCHEMA") {
            config.client.default_schema = (!schema.is_empty()).then_some(schema);
        }
        if let Some(level) = env_parse::<Level>("MYSQLX_LOG_LEVEL")? {
            config.logging.log_level = level;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.client.validate();
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

fn strict(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Configuration validation failed:\n  - {}",
            errors.join("\n  - ")
        )))
    }
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid value for {name}: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

/// Whether the session negotiates TLS after the capabilities exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Never request TLS.
    Disabled,
    /// Use TLS when the server offers it.
    #[default]
    Preferred,
    /// Fail the connect when the server does not offer TLS.
    Required,
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" => Ok(TlsMode::Disabled),
            "preferred" => Ok(TlsMode::Preferred),
            "required" => Ok(TlsMode::Required),
            other => Err(format!("unknown TLS mode '{other}'")),
        }
    }
}

/// Authentication mechanism used during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// `PLAIN` over TLS or a local socket, `MYSQL41` otherwise.
    #[default]
    Auto,
    Plain,
    Mysql41,
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(AuthMethod::Auto),
            "plain" => Ok(AuthMethod::Plain),
            "mysql41" => Ok(AuthMethod::Mysql41),
            other => Err(format!("unknown auth method '{other}'")),
        }
    }
}

/// Session options
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout for each TCP connection attempt
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Timeout for a single blocking read
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,

    /// Timeout for a single blocking write
    #[serde(with = "duration_serde")]
    pub write_timeout: Duration,

    /// Largest frame payload accepted from or sent to the server
    pub max_frame_size: usize,

    pub tls_mode: TlsMode,

    /// Verify the server certificate against the webpki roots
    pub tls_verify: bool,

    pub auth_method: AuthMethod,

    /// Issue `SELECT @@version` once the session is ready
    pub fetch_server_version: bool,

    /// Schema used when the credentials do not name one
    pub default_schema: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            tls_mode: TlsMode::Preferred,
            tls_verify: true,
            auth_method: AuthMethod::Auto,
            fetch_server_version: true,
            default_schema: None,
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        // zero would mean "block forever" to the socket layer, which rejects it
        if self.read_timeout.is_zero() {
            errors.push("Read timeout must be greater than 0".to_string());
        }
        if self.write_timeout.is_zero() {
            errors.push("Write timeout must be greater than 0".to_string());
        }

        if self.max_frame_size < 1024 {
            errors.push("Max frame size too small (minimum: 1 KB)".to_string());
        } else if self.max_frame_size > crate::core::frame::MAX_ENCODABLE_PAYLOAD {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum: {})",
                self.max_frame_size,
                crate::core::frame::MAX_ENCODABLE_PAYLOAD
            ));
        }

        if self.tls_mode == TlsMode::Disabled && self.auth_method == AuthMethod::Plain {
            errors.push(
                "WARNING: PLAIN authentication without TLS sends the password in clear text"
                    .to_string(),
            );
        }

        if let Some(schema) = &self.default_schema {
            if schema.is_empty() {
                errors.push("Default schema cannot be an empty string".to_string());
            } else if schema.len() > 64 {
                errors.push(format!(
                    "Default schema name too long: {} characters (maximum: 64)",
                    schema.len()
                ));
            }
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("mysqlx-protocol"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_empty());
        assert_eq!(ClientConfig::default().max_frame_size, 16 * 1024 * 1024);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config = Config::from_toml(
            r#"
            [client]
            read_timeout = 1500
            tls_mode = "required"
            auth_method = "mysql41"
            "#,
        )
        .unwrap();

        assert_eq!(config.client.read_timeout, Duration::from_millis(1500));
        assert_eq!(config.client.tls_mode, TlsMode::Required);
        assert_eq!(config.client.auth_method, AuthMethod::Mysql41);
        assert_eq!(config.client.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.logging.log_level, Level::INFO);
    }

    #[test]
    fn unknown_tls_mode_is_rejected() {
        let err = Config::from_toml("[client]\ntls_mode = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn example_config_parses_back() {
        let text = Config::example_config();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.client.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(parsed.logging.app_name, "mysqlx-protocol");
    }
}

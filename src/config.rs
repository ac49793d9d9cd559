//! Configuration module for the mudgate server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.
//!
//! The one setting that matters to the wire is `protocol`: it selects
//! which session handler the server instantiates per connection. The
//! `server-echo` handler is the baseline telnet handler plus one forced
//! IAC WILL ECHO directive at connection open.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// Which session handler to instantiate per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionProtocol {
    /// Baseline telnet handler (framework default).
    Telnet,
    /// Baseline handler plus a forced IAC WILL ECHO on connect; the
    /// server then echoes typed characters back itself.
    ServerEcho,
}

impl Default for SessionProtocol {
    fn default() -> Self {
        SessionProtocol::Telnet
    }
}

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "mudgate")]
#[command(author = "mudgate authors")]
#[command(version = "0.1.0")]
#[command(about = "A telnet front-end for MUD-style game servers", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:4000)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Session protocol (telnet, server-echo)
    #[arg(short = 'p', long, value_enum)]
    pub protocol: Option<SessionProtocol>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Session protocol handler
    #[serde(default)]
    pub protocol: SessionProtocol,
    /// Number of worker threads
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            protocol: SessionProtocol::default(),
            workers: None,
        }
    }
}

/// Session-related configuration
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Banner line sent after the opening negotiation
    #[serde(default = "default_banner")]
    pub banner: String,
    /// Maximum accepted input line length in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Idle timeout in seconds (0 = no timeout)
    #[serde(default)]
    pub idle_timeout: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            banner: default_banner(),
            max_line_length: default_max_line_length(),
            idle_timeout: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:4000".to_string()
}

fn default_banner() -> String {
    "Connected to mudgate.".to_string()
}

fn default_max_line_length() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub protocol: SessionProtocol,
    pub banner: String,
    pub max_line_length: usize,
    pub idle_timeout: u64,
    pub workers: Option<usize>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();
        Self::from_cli(cli)
    }

    fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        // Merge CLI args with TOML config (CLI takes precedence)
        Ok(Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            protocol: cli.protocol.unwrap_or(toml_config.server.protocol),
            banner: toml_config.session.banner,
            max_line_length: toml_config.session.max_line_length,
            idle_timeout: toml_config.session.idle_timeout,
            workers: cli.workers.or(toml_config.server.workers),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: default_listen(),
            protocol: SessionProtocol::default(),
            banner: default_banner(),
            max_line_length: default_max_line_length(),
            idle_timeout: 0,
            workers: None,
            log_level: default_log_level(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "127.0.0.1:4000");
        assert_eq!(config.server.protocol, SessionProtocol::Telnet);
        assert_eq!(config.session.max_line_length, 1024);
        assert_eq!(config.session.idle_timeout, 0);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "0.0.0.0:4000"
            protocol = "server-echo"
            workers = 4

            [session]
            banner = "Welcome, adventurer."
            max_line_length = 512
            idle_timeout = 300

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:4000");
        assert_eq!(config.server.protocol, SessionProtocol::ServerEcho);
        assert_eq!(config.server.workers, Some(4));
        assert_eq!(config.session.banner, "Welcome, adventurer.");
        assert_eq!(config.session.max_line_length, 512);
        assert_eq!(config.session.idle_timeout, 300);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_protocol_defaults_to_baseline() {
        // Omitting the override leaves the framework-default handler
        let toml_str = r#"
            [server]
            listen = "127.0.0.1:4000"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.protocol, SessionProtocol::Telnet);
    }

    #[test]
    fn test_cli_precedence() {
        let cli = CliArgs {
            config: None,
            listen: Some("127.0.0.1:5000".to_string()),
            protocol: Some(SessionProtocol::ServerEcho),
            workers: None,
            log_level: "info".to_string(),
        };

        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.listen, "127.0.0.1:5000");
        assert_eq!(config.protocol, SessionProtocol::ServerEcho);
        assert_eq!(config.log_level, "info");
    }
}

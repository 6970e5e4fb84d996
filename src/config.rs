//! Configuration management for the MCP tool server
//!
//! Handles paths, environment variables, and configuration loading.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result, ToolServerError};

/// Default maximum size for files handled by the file tools (1 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Log levels accepted by `MCP_LOG_LEVEL`
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration for the MCP tool server
#[derive(Debug, Clone)]
pub struct Config {
    /// Name reported in `serverInfo`
    pub server_name: String,

    /// Version reported in `serverInfo`
    pub server_version: String,

    /// Host for the TCP listener
    pub host: String,

    /// Port for the TCP listener
    pub port: u16,

    /// Base directory for relative paths given to the file tools
    pub work_dir: PathBuf,

    /// Largest file the file tools will read or write, in bytes
    pub max_file_size: u64,

    /// Default tracing filter directive
    pub log_level: String,
}

impl Config {
    /// Create a configuration from environment variables with defaults
    pub fn new() -> Result<Self> {
        let server_name =
            std::env::var("MCP_SERVER_NAME").unwrap_or_else(|_| "mcp-tool-server".to_string());

        let host = std::env::var("MCP_SERVER_HOST").unwrap_or_else(|_| "localhost".to_string());

        let port = parse_env("MCP_SERVER_PORT", 8080u16)?;

        let work_dir = std::env::var("WORK_DIRECTORY")
            .map(|dir| expand_home(&dir))
            .unwrap_or_else(|_| PathBuf::from("./workspace"));

        let max_file_size = parse_env("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?;

        let log_level = std::env::var("MCP_LOG_LEVEL")
            .map(|level| level.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = Self {
            server_name,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            host,
            port,
            work_dir,
            max_file_size,
            log_level,
        };
        config.validate()?;

        Ok(config)
    }

    /// Create a configuration rooted at the given working directory
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_name: "mcp-tool-server".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            host: "localhost".to_string(),
            port: 8080,
            work_dir: work_dir.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            log_level: "info".to_string(),
        }
    }

    /// Check the values that cannot be expressed by their types alone
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(invalid("MCP_SERVER_PORT must be between 1 and 65535"));
        }
        if self.max_file_size == 0 {
            return Err(invalid("MAX_FILE_SIZE must be greater than 0"));
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(invalid(&format!("unknown log level '{}'", self.log_level)));
        }
        Ok(())
    }

    /// Address string for the TCP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve a tool-supplied path against the working directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.work_dir.join(candidate)
        }
    }

    /// Create the working directory if it doesn't exist
    pub fn ensure_work_dir(&self) -> Result<()> {
        if !self.work_dir.exists() {
            std::fs::create_dir_all(&self.work_dir).map_err(|_| {
                ToolServerError::Config(ConfigError::DirCreationFailed {
                    path: self.work_dir.display().to_string(),
                })
            })?;
            tracing::info!("Created working directory {}", self.work_dir.display());
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, default: T) -> Result<T> {
    match std::env::var(var) {
        Ok(value) => value.trim().parse().map_err(|_| {
            ToolServerError::Config(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                value,
            })
        }),
        Err(_) => Ok(default),
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn invalid(message: &str) -> ToolServerError {
    ToolServerError::Config(ConfigError::InvalidConfig {
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_work_dir_defaults() {
        let config = Config::with_work_dir("/tmp/tools");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_path() {
        let config = Config::with_work_dir("/srv/work");
        assert_eq!(config.resolve_path("t.txt"), PathBuf::from("/srv/work/t.txt"));
        assert_eq!(config.resolve_path("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::with_work_dir("/tmp");
        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::with_work_dir("/tmp");
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::with_work_dir("/tmp");
        config.max_file_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("relative/dir"), PathBuf::from("relative/dir"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/work"), home.join("work"));
        }
    }

    #[test]
    fn test_listen_addr() {
        let config = Config::with_work_dir("/tmp");
        assert_eq!(config.listen_addr(), "localhost:8080");
    }
}

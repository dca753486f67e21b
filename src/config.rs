//! Server configuration, loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parser::ParserConfig;
use crate::wire::DEFAULT_READ_BUFFER_SIZE;

/// A directory served under a URL prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMount {
    pub prefix: String,
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Bytes requested from the socket per read call.
    pub read_buffer_size: usize,
    /// Limit on request line plus headers.
    pub max_head_size: usize,
    pub max_headers: usize,
    /// Limit on a declared `Content-Length`.
    pub max_body_size: usize,
    /// Socket read deadline in milliseconds, `0` for none.
    pub read_timeout_ms: u64,
    /// Socket write deadline in milliseconds, `0` for none.
    pub write_timeout_ms: u64,
    pub static_mounts: Vec<StaticMount>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let limits = ParserConfig::default();
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_head_size: limits.max_head_size,
            max_headers: limits.max_headers_count,
            max_body_size: limits.max_body_size,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            static_mounts: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Decoder limits derived from this configuration.
    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            max_head_size: self.max_head_size,
            max_headers_count: self.max_headers,
            max_body_size: self.max_body_size,
            ..ParserConfig::default()
        }
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Check semantic constraints, reporting every violation found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.bind_address.trim().is_empty() {
        errors.push("bind_address must not be empty".to_string());
    }
    if config.read_buffer_size == 0 {
        errors.push("read_buffer_size must be greater than 0".to_string());
    }
    if config.max_head_size == 0 {
        errors.push("max_head_size must be greater than 0".to_string());
    }
    if config.max_headers == 0 {
        errors.push("max_headers must be greater than 0".to_string());
    }
    for mount in &config.static_mounts {
        if !mount.prefix.starts_with('/') {
            errors.push(format!(
                "static mount prefix '{}' must start with '/'",
                mount.prefix
            ));
        }
        if mount.root.as_os_str().is_empty() {
            errors.push(format!("static mount '{}' has an empty root", mount.prefix));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

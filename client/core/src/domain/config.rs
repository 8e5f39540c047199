// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Client Configuration
//!
//! YAML configuration for the UDP transport and the vnode cache, with the
//! usual discovery order and environment overrides. A missing file is not an
//! error: every field has a default that talks to a stock NFSv2 server.
//!
//! ```yaml
//! transport:
//!   timeout_ms: 1000
//!   retransmits: 3
//!   portmap_port: 111
//!   machine_name: nfsc
//!   uid: 0
//!   gid: 0
//! cache:
//!   initial_capacity: 1024
//! ```
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for config

use crate::domain::cache::DEFAULT_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "NFSC_CONFIG_PATH";

/// Longest machine name AUTH_UNIX credentials may carry
pub const MAX_MACHINE_NAME_LEN: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("transport.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("transport.portmap_port must be non-zero")]
    ZeroPortmapPort,

    #[error("transport.machine_name must be 1..={max} bytes, got {len}")]
    MachineName { len: usize, max: usize },

    #[error("cache.initial_capacity must be greater than zero")]
    ZeroCacheCapacity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub transport: TransportConfig,
    pub cache: CacheConfig,
}

/// ONC-RPC transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-attempt reply timeout
    pub timeout_ms: u64,
    /// Extra attempts after the first send times out
    pub retransmits: u32,
    /// Port of the server's portmapper
    pub portmap_port: u16,
    /// AUTH_UNIX credentials
    pub machine_name: String,
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Initial bucket capacity of a mount's vnode cache
    pub initial_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            retransmits: 3,
            portmap_port: 111,
            machine_name: "nfsc".to_string(),
            uid: 0,
            gid: 0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ClientConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. NFSC_CONFIG_PATH environment variable
    /// 2. ./nfsc-config.yaml (working directory)
    /// 3. ~/.nfsc/config.yaml (user home)
    /// 4. /etc/nfsc/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./nfsc-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".nfsc").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/nfsc/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::debug!("No configuration file found in standard locations, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `NFSC_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides read through `lookup` instead of the process environment
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("NFSC_TIMEOUT_MS") {
            match val.parse::<u64>() {
                Ok(ms) => {
                    tracing::info!("Environment override: NFSC_TIMEOUT_MS={}", ms);
                    self.transport.timeout_ms = ms;
                }
                Err(_) => tracing::warn!("Invalid value for NFSC_TIMEOUT_MS: '{}'. Ignoring.", val),
            }
        }

        if let Some(val) = lookup("NFSC_RETRANSMITS") {
            match val.parse::<u32>() {
                Ok(n) => {
                    tracing::info!("Environment override: NFSC_RETRANSMITS={}", n);
                    self.transport.retransmits = n;
                }
                Err(_) => tracing::warn!("Invalid value for NFSC_RETRANSMITS: '{}'. Ignoring.", val),
            }
        }

        if let Some(val) = lookup("NFSC_PORTMAP_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: NFSC_PORTMAP_PORT={}", port);
                    self.transport.portmap_port = port;
                }
                Err(_) => tracing::warn!("Invalid value for NFSC_PORTMAP_PORT: '{}'. Ignoring.", val),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.transport.portmap_port == 0 {
            return Err(ConfigError::ZeroPortmapPort);
        }
        let len = self.transport.machine_name.len();
        if len == 0 || len > MAX_MACHINE_NAME_LEN {
            return Err(ConfigError::MachineName {
                len,
                max: MAX_MACHINE_NAME_LEN,
            });
        }
        if self.cache.initial_capacity == 0 {
            return Err(ConfigError::ZeroCacheCapacity);
        }
        Ok(())
    }
}

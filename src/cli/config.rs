//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./hostlaunch.toml or ./.hostlaunch/config.toml
//! 2. User config: ~/.hostlaunch/config.toml
//! 3. System config: /etc/hostlaunch/config.toml
//! 4. Built-in defaults

use crate::env;
use crate::launcher::{DockerEngineConfig, RunOptions};
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Engine connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Socket URI; probes local defaults and Podman sockets when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        let engine = DockerEngineConfig::default();
        Self {
            socket: engine.socket,
            timeout_secs: engine.timeout,
        }
    }
}

/// Defaults applied to every run unless overridden on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    /// `name:soft:hard` overrides; empty copies the host's limits
    pub ulimits: Vec<String>,
    pub pull_missing: bool,
    pub remove_stale: bool,
    pub envdirs: Vec<PathBuf>,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        let options = RunOptions::default();
        Self {
            ulimits: Vec::new(),
            pull_missing: options.pull_missing,
            remove_stale: options.remove_stale,
            envdirs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// `tracing` env-filter directive; `RUST_LOG` takes precedence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    pub engine: EngineSection,
    pub defaults: DefaultsSection,
}

impl LauncherConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn engine_config(&self) -> DockerEngineConfig {
        DockerEngineConfig {
            socket: self.engine.socket.clone(),
            timeout: self.engine.timeout_secs,
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            pull_missing: self.defaults.pull_missing,
            remove_stale: self.defaults.remove_stale,
            detach: false,
        }
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the explicit config if given, else discover one, else use defaults.
    pub fn load(explicit: Option<&Path>) -> Result<LauncherConfig, ConfigError> {
        if let Some(path) = explicit {
            info!("Loading configuration from: {:?}", path);
            return LauncherConfig::from_toml_file(path);
        }

        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return LauncherConfig::from_toml_file(config_path);
        }

        debug!("No configuration file found, using defaults");
        Ok(LauncherConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        Self::get_config_candidates().into_iter().find(|candidate| {
            debug!("Checking for config file: {:?}", candidate);
            candidate.is_file()
        })
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(env::local_plain_config_file_path(&current_dir));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from(env::SYSTEM_CONFIG_PATH));

        candidates
    }

    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME").ok().map(PathBuf::from)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }
    }
}

//! CLI-specific functionality for the launcher
//!
//! This module contains argument parsing and configuration discovery.

pub mod args;
pub mod config;

pub use args::{Args, Commands, ExecutionMode, RunConfig};
pub use config::{ConfigDiscovery, ConfigError, LauncherConfig};

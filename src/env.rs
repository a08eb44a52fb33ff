//! Environment constants and path utilities.
//!
//! Centralizes the directory and file names used for configuration discovery.

use std::path::{Path, PathBuf};

/// Application directory name (hidden directory like .git)
pub const APP_DIR_NAME: &str = ".hostlaunch";

/// Configuration file name inside [`APP_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Stand-alone configuration file name in the working directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "hostlaunch.toml";

/// System-wide configuration file (Unix-like systems)
pub const SYSTEM_CONFIG_PATH: &str = "/etc/hostlaunch/config.toml";

/// Default log filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "hostlaunch=info";

/// Log filter used with `--verbose`
pub const VERBOSE_LOG_FILTER: &str = "hostlaunch=debug";

/// Prefix for generated container names
pub const CONTAINER_NAME_PREFIX: &str = "hostlaunch";

/// Build the app directory path under a base directory
pub fn app_dir_path(base: &Path) -> PathBuf {
    base.join(APP_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    app_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build hidden-directory config file path in the current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    app_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

/// Build stand-alone config file path in the current directory
pub fn local_plain_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(LOCAL_CONFIG_FILE_NAME)
}

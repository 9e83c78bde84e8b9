//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Runtime service configuration resolved from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener
    pub bind_addr: String,
    /// Listen port
    pub port: u16,
    /// Honor the hardcoded `dev-admin-token` bearer value.
    ///
    /// Grants unconditional admin identity, so it must be explicitly enabled
    /// and should never be set in production deployments.
    pub allow_dev_admin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 5730,
            allow_dev_admin: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// - `FUELRATE_BIND` - bind address (default 127.0.0.1)
    /// - `FUELRATE_PORT` - listen port (default 5730)
    /// - `FUELRATE_ALLOW_DEV_ADMIN` - "true" enables the dev admin token
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(bind) = std::env::var("FUELRATE_BIND") {
            if !bind.trim().is_empty() {
                config.bind_addr = bind;
            }
        }

        if let Ok(port) = std::env::var("FUELRATE_PORT") {
            config.port = port
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("Invalid FUELRATE_PORT: {}", e)))?;
        }

        if let Ok(flag) = std::env::var("FUELRATE_ALLOW_DEV_ADMIN") {
            config.allow_dev_admin = flag.eq_ignore_ascii_case("true");
        }

        Ok(config)
    }
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. FUELRATE_ROOT environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("FUELRATE_ROOT") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Path of the SQLite database inside the root folder
pub fn database_path(root_folder: &std::path::Path) -> PathBuf {
    root_folder.join("fuelrate.db")
}

/// Locate the configuration file for the platform
fn find_config_file() -> Result<PathBuf> {
    // ~/.config/fuelrate/config.toml first, then /etc/fuelrate/config.toml
    if let Some(user_config) = dirs::config_dir().map(|d| d.join("fuelrate").join("config.toml")) {
        if user_config.exists() {
            return Ok(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/fuelrate/config.toml");
    if system_config.exists() {
        return Ok(system_config);
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fuelrate"))
        .unwrap_or_else(|| PathBuf::from("./fuelrate_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_wins() {
        let root = resolve_root_folder(Some("/tmp/fuelrate-test"));
        assert_eq!(root, PathBuf::from("/tmp/fuelrate-test"));
    }

    #[test]
    fn test_database_path() {
        let root = PathBuf::from("/data/fuelrate");
        assert_eq!(
            database_path(&root),
            PathBuf::from("/data/fuelrate/fuelrate.db")
        );
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 5730);
        assert!(!config.allow_dev_admin);
    }
}

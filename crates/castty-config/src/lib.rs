//! Monitor front-end configuration.
//!
//! Precedence, lowest to highest: built-in defaults, `~/.castty/config.toml`
//! (a missing file is not an error), explicit CLI flags.

pub mod errors;

use std::fs;
use std::path::Path;

use castty_paths::CasttyPaths;
use serde::{Deserialize, Serialize};

pub use errors::ConfigError;

fn default_monitor_host() -> String {
    "localhost".to_string()
}

fn default_monitor_port() -> u16 {
    8888
}

fn default_monitor_buffer_size() -> usize {
    1000
}

/// The monitor front-end's effective settings for one `record` invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    #[serde(default = "default_monitor_host")]
    pub host: String,
    #[serde(default = "default_monitor_port")]
    pub port: u16,
    #[serde(default = "default_monitor_buffer_size")]
    pub buffer_size: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: default_monitor_host(),
            port: default_monitor_port(),
            buffer_size: default_monitor_buffer_size(),
        }
    }
}

impl MonitorConfig {
    /// Reject configurations that would never open a usable front-end.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid {
                message: "monitor buffer size must be > 0".to_string(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                message: "monitor port must be nonzero".to_string(),
            });
        }
        if self.port == u16::MAX {
            return Err(ConfigError::Invalid {
                message: format!("monitor port {} leaves no room for the push endpoint at port+1", self.port),
            });
        }
        Ok(())
    }

    /// The push-protocol endpoint always lives one port above the page server.
    pub fn push_port(&self) -> u16 {
        self.port + 1
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    monitor: MonitorOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct MonitorOverrides {
    host: Option<String>,
    port: Option<u16>,
    buffer_size: Option<usize>,
}

fn is_file_not_found(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::NotFound
}

/// Load `~/.castty/config.toml` if present and merge it over the defaults.
/// A missing file is not an error; a malformed file is.
pub fn load_user_config() -> Result<MonitorConfig, ConfigError> {
    let paths = CasttyPaths::resolve().map_err(|e| ConfigError::Invalid {
        message: e.to_string(),
    })?;
    load_config_file(&paths.user_config())
}

fn load_config_file(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let mut config = MonitorConfig::default();

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if is_file_not_found(&e) => return Ok(config),
        Err(e) => return Err(ConfigError::Io(e)),
    };

    let file_config: FileConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    if let Some(host) = file_config.monitor.host {
        config.host = host;
    }
    if let Some(port) = file_config.monitor.port {
        config.port = port;
    }
    if let Some(buffer_size) = file_config.monitor.buffer_size {
        config.buffer_size = buffer_size;
    }

    Ok(config)
}

/// Apply explicit CLI overrides, highest precedence, over a loaded config.
pub fn apply_cli_overrides(
    mut config: MonitorConfig,
    host: Option<String>,
    port: Option<u16>,
    buffer_size: Option<usize>,
) -> MonitorConfig {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(buffer_size) = buffer_size {
        config.buffer_size = buffer_size;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_spec() {
        let config = MonitorConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8888);
        assert_eq!(config.buffer_size, 1000);
        assert_eq!(config.push_port(), 8889);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = load_config_file(&path).unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn file_overrides_apply_partially() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[monitor]\nport = 9000\n").unwrap();
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "localhost");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not valid toml [[[").unwrap();
        let err = load_config_file(&path).unwrap_err();
        assert_eq!(err.error_code(), "config_parse_error");
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let config = MonitorConfig::default();
        let overridden = apply_cli_overrides(config, Some("0.0.0.0".to_string()), None, Some(500));
        assert_eq!(overridden.host, "0.0.0.0");
        assert_eq!(overridden.port, 8888);
        assert_eq!(overridden.buffer_size, 500);
    }

    #[test]
    fn rejects_zero_buffer_size() {
        let mut config = MonitorConfig::default();
        config.buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = MonitorConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }
}

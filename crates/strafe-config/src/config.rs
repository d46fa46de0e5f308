//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Session lifecycle settings (timeouts, reconnection, host identity).
    pub session: SessionConfig,
    /// Network/multiplayer settings.
    pub network: NetworkConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Session loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a joining client waits for the host's map-change reply.
    pub handshake_timeout_ms: u64,
    /// Reconnect attempts after a host-initiated map change.
    pub reconnect_attempts: u32,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay_ms: u64,
    /// Pause between kicking players and reloading on a map change.
    pub map_change_settle_ms: u64,
    /// Advertised session name (host only).
    pub server_name: String,
    /// Session password (host only, empty = open).
    pub server_password: String,
    /// Gamemode used when none is given explicitly.
    pub default_gamemode: String,
}

/// Network/multiplayer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host address to join.
    pub server_address: String,
    /// Host port.
    pub server_port: u16,
    /// Password sent when joining.
    pub password: String,
    /// Simulation tick rate (Hz).
    pub tick_rate: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: 5000,
            reconnect_attempts: 8,
            reconnect_delay_ms: 1500,
            map_change_settle_ms: 100,
            server_name: "Strafe Server".to_string(),
            server_password: String::new(),
            default_gamemode: "surf".to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".to_string(),
            server_port: 27015,
            password: String::new(),
            tick_rate: 100,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Platform config directory for Strafe (`<config_dir>/strafe`), if the
/// platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("strafe"))
}

/// File name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.session.validate()?;
    Ok(config)
}

impl SessionConfig {
    /// Reject values the session loader can't work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handshake_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "session.handshake_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.reconnect_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "session.reconnect_attempts",
                reason: "at least one attempt is required".to_string(),
            });
        }
        if self.default_gamemode.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "session.default_gamemode",
                reason: "must name a gamemode".to_string(),
            });
        }
        Ok(())
    }
}

impl Config {
    /// Read `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default session config to {}", path.display());
            return Ok(config);
        }

        let config = read_config(&path)?;
        log::info!(
            "Session config loaded from {} (handshake {} ms, {} reconnect attempts)",
            path.display(),
            config.session.handshake_timeout_ms,
            config.session.reconnect_attempts
        );
        Ok(config)
    }

    /// Write this config to `config_dir/config.ron`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        let write_error = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(config_dir).map_err(write_error)?;
        let pretty = ron::ser::PrettyConfig::new().depth_limit(2);
        let serialized = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(&path, serialized).map_err(write_error)
    }

    /// Re-read the file. Returns the new config only if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = read_config(&config_dir.join(CONFIG_FILE_NAME))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Session config changed on disk");
        Ok(Some(fresh))
    }
}

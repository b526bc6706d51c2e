//! Client configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (RALLY_HOST, RALLY_GAME_ROOM)
//! - TOML configuration file

use anyhow::{Context, Result};
use rally_transport::{RoomAddress, WebSocketConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Coordinator host, optionally with port or scheme.
    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Presence pipeline.
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Match game pipeline.
    #[serde(default)]
    pub session: SessionConfig,

    /// Room directory pipeline.
    #[serde(default)]
    pub rooms: RoomsConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Presence pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Enable the presence pipeline.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Party name.
    #[serde(default = "default_presence_party")]
    pub party: String,

    /// Shared room every agent joins.
    #[serde(default = "default_presence_room")]
    pub room: String,
}

/// Match game pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Party name.
    #[serde(default = "default_session_party")]
    pub party: String,

    /// Game room. The pipeline only runs when a room is set.
    #[serde(default = "default_session_room")]
    pub room: Option<String>,

    /// How long win/lose flashes stay lit, in milliseconds.
    #[serde(default = "default_flash_duration")]
    pub flash_duration_ms: u64,
}

/// Room directory pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsConfig {
    /// Enable the room directory pipeline.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Party name.
    #[serde(default = "default_rooms_party")]
    pub party: String,

    /// Singleton directory room.
    #[serde(default = "default_rooms_room")]
    pub room: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default)]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    std::env::var("RALLY_HOST").unwrap_or_else(|_| "localhost:1999".to_string())
}

fn default_max_message_size() -> usize {
    1024 * 1024 // 1 MB
}

fn default_true() -> bool {
    true
}

fn default_presence_party() -> String {
    "cursors".to_string()
}

fn default_presence_room() -> String {
    "shared-cursors".to_string()
}

fn default_session_party() -> String {
    "game".to_string()
}

fn default_session_room() -> Option<String> {
    std::env::var("RALLY_GAME_ROOM").ok().filter(|r| !r.is_empty())
}

fn default_flash_duration() -> u64 {
    300
}

fn default_rooms_party() -> String {
    "chatrooms".to_string()
}

fn default_rooms_room() -> String {
    "index".to_string()
}

fn default_metrics_port() -> u16 {
    9091
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            max_message_size: default_max_message_size(),
            presence: PresenceConfig::default(),
            session: SessionConfig::default(),
            rooms: RoomsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            party: default_presence_party(),
            room: default_presence_room(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            party: default_session_party(),
            room: default_session_room(),
            flash_duration_ms: default_flash_duration(),
        }
    }
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            party: default_rooms_party(),
            room: default_rooms_room(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "rally.toml",
            "/etc/rally/rally.toml",
            "~/.config/rally/rally.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Address of the shared presence room.
    ///
    /// # Errors
    ///
    /// Returns an error if the host, party or room is invalid.
    pub fn presence_address(&self) -> Result<RoomAddress> {
        RoomAddress::new(&self.host, &self.presence.party, &self.presence.room)
            .context("Invalid presence room")
    }

    /// Address of the configured game room, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the host, party or room is invalid.
    pub fn session_address(&self) -> Result<Option<RoomAddress>> {
        self.session
            .room
            .as_deref()
            .map(|room| {
                RoomAddress::new(&self.host, &self.session.party, room)
                    .context("Invalid game room")
            })
            .transpose()
    }

    /// Address of the room directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the host, party or room is invalid.
    pub fn rooms_address(&self) -> Result<RoomAddress> {
        RoomAddress::new(&self.host, &self.rooms.party, &self.rooms.room)
            .context("Invalid room directory")
    }

    /// Flash duration for the match game.
    #[must_use]
    pub fn flash_duration(&self) -> Duration {
        Duration::from_millis(self.session.flash_duration_ms)
    }

    /// WebSocket transport settings.
    #[must_use]
    pub fn websocket(&self) -> WebSocketConfig {
        WebSocketConfig {
            max_message_size: self.max_message_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.presence.enabled);
        assert_eq!(config.presence.party, "cursors");
        assert_eq!(config.presence.room, "shared-cursors");
        assert_eq!(config.session.party, "game");
        assert_eq!(config.flash_duration(), Duration::from_millis(300));
        assert_eq!(config.rooms.party, "chatrooms");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "rally.example.dev"

            [session]
            room = "room-42"
            flash_duration_ms = 500

            [rooms]
            enabled = false
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "rally.example.dev");
        assert_eq!(config.session.room.as_deref(), Some("room-42"));
        assert_eq!(config.flash_duration(), Duration::from_millis(500));
        assert!(!config.rooms.enabled);
        assert_eq!(config.presence.room, "shared-cursors");

        let address = config.session_address().unwrap().unwrap();
        assert_eq!(address.party(), "game");
        assert_eq!(address.room(), "room-42");
    }

    #[test]
    fn test_invalid_room_is_rejected() {
        let toml_str = r#"
            host = "localhost:1999"

            [presence]
            room = "bad/room"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.presence_address().is_err());
    }
}

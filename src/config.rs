//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/ctxswitch/config.json`.
//! Every section is optional so the file can grow without breaking older
//! ones.
//!
//! # Example
//!
//! ```json
//! {
//!   "titles": {
//!     "browsers": [
//!       { "bundles": ["firefox"], "separators": [" - Mozilla Firefox - "] }
//!     ]
//!   },
//!   "switch": {
//!     "excluded_bundles": ["com.apple.finder", "waybar"]
//!   },
//!   "paths": {
//!     "store": "/home/me/.local/share/ctxswitch/workspaces.json"
//!   }
//! }
//! ```

use crate::title::TitleRules;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
///
/// Every field is optional: a minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Stable-name heuristics per application family.
    #[serde(default)]
    pub titles: TitleRules,

    /// Workspace switching behaviour.
    #[serde(default)]
    pub switch: SwitchConfig,

    /// File and socket locations.
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Workspace switching behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// System utilities that a switch never hides.
    pub excluded_bundles: Vec<String>,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            excluded_bundles: vec![
                "com.apple.finder".into(),
                "com.apple.systempreferences".into(),
                "com.apple.SystemPreferences".into(),
            ],
        }
    }
}

/// Optional path overrides.  `None` means the platform default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Workspace list.
    pub store: Option<PathBuf>,
    /// Command socket.
    pub socket: Option<PathBuf>,
    /// Key-forwarding socket.
    pub key_socket: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/ctxswitch/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ctxswitch")
            .join("config.json")
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "titles": {
                "browsers": [
                    { "bundles": ["firefox"], "separators": [" - Mozilla Firefox - "] }
                ],
                "ide_prefixes": ["code-"]
            },
            "switch": { "excluded_bundles": ["waybar"] },
            "paths": {
                "store": "/tmp/ws.json",
                "socket": "/tmp/cmd.sock",
                "key_socket": "/tmp/keys.sock"
            }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.titles.browsers.len(), 1);
        assert_eq!(cfg.titles.ide_prefixes, vec!["code-".to_string()]);
        assert_eq!(cfg.switch.excluded_bundles, vec!["waybar".to_string()]);
        assert_eq!(cfg.paths.store, Some(PathBuf::from("/tmp/ws.json")));
        assert_eq!(cfg.paths.socket, Some(PathBuf::from("/tmp/cmd.sock")));
        assert_eq!(cfg.paths.key_socket, Some(PathBuf::from("/tmp/keys.sock")));
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.titles, TitleRules::default());
        assert_eq!(cfg.switch.excluded_bundles, SwitchConfig::default().excluded_bundles);
        assert!(cfg.switch.excluded_bundles.contains(&"com.apple.finder".to_string()));
        assert!(cfg.paths.store.is_none());
        assert!(cfg.paths.socket.is_none());
    }

    #[test]
    fn deserialize_partial_sections() {
        let json = r#"{ "titles": { "ide_prefixes": [] }, "paths": { "socket": "/run/x.sock" } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert!(cfg.titles.ide_prefixes.is_empty());
        assert_eq!(cfg.titles.browsers, TitleRules::default().browsers);
        assert_eq!(cfg.paths.socket, Some(PathBuf::from("/run/x.sock")));
        assert!(cfg.paths.key_socket.is_none());
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "switch": {}, "future_section": { "key": 42 } }"#;
        // Should not fail, unknown keys are silently ignored.
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(Config::load(&path).is_err());
        std::fs::write(&path, "{ nope").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
        std::fs::write(&path, r#"{"switch":{"excluded_bundles":[]}}"#).unwrap();
        assert!(Config::load(&path).unwrap().switch.excluded_bundles.is_empty());
    }
}

use directories::ProjectDirs;
use micmeter_core::constants::{
    DEFAULT_HISTORY_LEN, DEFAULT_INTERVAL_MS, DEFAULT_SMOOTHING, DEFAULT_WINDOW_LEN,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Application configuration for persisting meter preferences.
#[derive(Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_window_len")]
    pub window_len: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_history_len")]
    pub history_len: usize,
    #[serde(default = "default_show_bar")]
    pub show_bar: bool,
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_window_len() -> usize {
    DEFAULT_WINDOW_LEN
}

fn default_smoothing() -> f32 {
    DEFAULT_SMOOTHING
}

fn default_history_len() -> usize {
    DEFAULT_HISTORY_LEN
}

fn default_show_bar() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            window_len: default_window_len(),
            smoothing: default_smoothing(),
            history_len: default_history_len(),
            show_bar: default_show_bar(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from disk, or returns default if not found.
    pub fn load() -> Self {
        if let Some(path) = config_path() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(cfg) = serde_json::from_str(&content) {
                    return cfg;
                }
            }
        }
        Self::default()
    }

    /// Saves configuration to disk in JSON format.
    pub fn save(&self) {
        if let Some(path) = config_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Ok(json) = serde_json::to_string_pretty(self) {
                let _ = fs::write(path, json);
            }
        }
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "micmeter", "micmeter")
        .map(|dirs| dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.interval_ms, 200);
        assert_eq!(config.window_len, 2048);
        assert_eq!(config.smoothing, 0.3);
        assert_eq!(config.history_len, 50);
        assert!(config.show_bar);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            interval_ms: 100,
            window_len: 256,
            smoothing: 0.5,
            history_len: 20,
            show_bar: false,
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"interval_ms\":100"));
        assert!(json.contains("\"window_len\":256"));
        assert!(json.contains("\"smoothing\":0.5"));
        assert!(json.contains("\"show_bar\":false"));
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        // Minimal JSON - should fill in defaults
        let json = r#"{"interval_ms":100}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.interval_ms, 100);
        assert_eq!(config.window_len, 2048); // Default
        assert_eq!(config.smoothing, 0.3); // Default
        assert!(config.show_bar); // Default true
    }

    #[test]
    fn test_config_roundtrip() {
        let original = AppConfig {
            interval_ms: 50,
            window_len: 4096,
            smoothing: 0.0,
            history_len: 10,
            show_bar: true,
        };

        let json = serde_json::to_string(&original).unwrap();
        let restored: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(original.interval_ms, restored.interval_ms);
        assert_eq!(original.window_len, restored.window_len);
        assert_eq!(original.smoothing, restored.smoothing);
        assert_eq!(original.history_len, restored.history_len);
    }
}

//! Persistent operator settings
//!
//! Stored as JSON under the platform config directory.

use crate::domain::catalog::CharacteristicId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "xle_simulator".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,

    /// Restore the operator's last values on the next launch
    #[serde(default = "default_true")]
    pub remember_values: bool,
    #[serde(default)]
    pub values: BTreeMap<CharacteristicId, String>,

    #[serde(default = "default_false")]
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            remember_values: default_true(),
            values: BTreeMap::new(),
            dark_mode: default_false(),
        }
    }
}

impl Settings {
    /// Values to overlay on the catalog defaults at startup
    pub fn remembered_values(&self) -> BTreeMap<CharacteristicId, String> {
        if self.remember_values {
            self.values.clone()
        } else {
            BTreeMap::new()
        }
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Load from an explicit file, falling back to defaults when it is
    /// missing or unreadable
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("XleSimulator");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Persist a committed operator value when remembering is enabled
    pub fn remember_value(&mut self, id: CharacteristicId, text: &str) -> anyhow::Result<()> {
        if !self.settings.remember_values {
            return Ok(());
        }
        if self.settings.values.get(&id).map(String::as_str) != Some(text) {
            self.settings.values.insert(id, text.to_string());
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("xle_simulator_test_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let service = SettingsService::with_path(temp_settings_path("missing.json"));
        assert_eq!(service.get(), &Settings::default());
        assert!(service.get().remember_values);
        assert_eq!(service.get().log_settings.file_name_prefix, "xle_simulator");
    }

    #[test]
    fn test_remembered_values_round_trip() {
        let path = temp_settings_path("values.json");
        let mut service = SettingsService::with_path(path.clone());
        service
            .remember_value(CharacteristicId::SimIccid, "8901260882")
            .unwrap();

        let reloaded = SettingsService::with_path(path);
        assert_eq!(
            reloaded.get().remembered_values().get(&CharacteristicId::SimIccid),
            Some(&"8901260882".to_string())
        );
    }

    #[test]
    fn test_remember_disabled_keeps_nothing() {
        let path = temp_settings_path("disabled.json");
        let mut service = SettingsService::with_path(path);
        service.get_mut().remember_values = false;
        service
            .remember_value(CharacteristicId::QrCode, "xfinity.x")
            .unwrap();

        assert!(service.get().values.is_empty());
        assert!(service.get().remembered_values().is_empty());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_settings_path("partial.json");
        fs::write(&path, r#"{ "values": { "ModelNumber": "7" } }"#).unwrap();

        let service = SettingsService::with_path(path);
        assert_eq!(
            service.get().values.get(&CharacteristicId::ModelNumber),
            Some(&"7".to_string())
        );
        assert_eq!(service.get().log_settings, LogSettings::default());
        assert!(!service.get().dark_mode);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let path = temp_settings_path("corrupt.json");
        fs::write(&path, "{ not json").unwrap();

        let service = SettingsService::with_path(path);
        assert_eq!(service.get(), &Settings::default());
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a config directory")]
    NoConfigDir,

    #[error("settings i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialise settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    #[default]
    Color,
    Image,
}

/// Persisted theme choice: palette name, stored value and kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSelection {
    pub name: String,
    pub value: String,
    pub kind: ThemeKind,
}

impl Default for ThemeSelection {
    fn default() -> Self {
        ThemeSelection {
            name: "default".to_string(),
            value: "default".to_string(),
            kind: ThemeKind::Color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub save_animation_ms: u64,
    pub theme: ThemeSelection,
    pub onboarding_complete: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: 30,
            save_animation_ms: 2400,
            theme: ThemeSelection::default(),
            onboarding_complete: false,
        }
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("emotion-diary").join("settings.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn save_animation(&self) -> Duration {
        Duration::from_millis(self.save_animation_ms)
    }
}

/// Owns the settings together with the file they persist to.
pub struct SettingsStore {
    path: Option<PathBuf>,
    settings: Settings,
}

impl SettingsStore {
    pub fn new(path: Option<PathBuf>, settings: Settings) -> Self {
        SettingsStore { path, settings }
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Applies `change` and writes the file; failures are logged, not fatal.
    pub fn update(&mut self, change: impl FnOnce(&mut Settings)) {
        change(&mut self.settings);
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Err(e) = self.settings.save_to(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not persist settings");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "server_url = \"http://diary.local\"\n").unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.server_url, "http://diary.local");
        assert_eq!(settings.request_timeout_secs, 30);
        assert!(!settings.onboarding_complete);
    }

    #[test]
    fn store_persists_updates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let mut store = SettingsStore::new(Some(path.clone()), Settings::default());
        store.update(|s| {
            s.onboarding_complete = true;
            s.theme = ThemeSelection {
                name: "night".into(),
                value: "night".into(),
                kind: ThemeKind::Color,
            };
        });

        let reloaded = Settings::load_from(&path).unwrap();
        assert!(reloaded.onboarding_complete);
        assert_eq!(reloaded.theme.name, "night");
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "server_url = [").unwrap();
        assert!(matches!(
            Settings::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Persisted console settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Delay between polls of the tailed file
    pub poll_interval_ms: u64,

    /// Capacity of the entry buffer
    pub max_entries: usize,

    /// Keep the newest entry in view as entries arrive
    pub auto_scroll: bool,

    /// Log file monitored in the previous session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_log_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_entries: DEFAULT_MAX_ENTRIES,
            auto_scroll: true,
            last_log_path: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file gives the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let settings: Self = toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings to `path`, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(write_err)
    }

    /// Save only if something differs from `original`, so a session that
    /// changed nothing leaves no file behind. Returns whether it wrote.
    pub fn save_if_changed(
        &self,
        original: &Settings,
        path: impl AsRef<Path>,
    ) -> Result<bool, SettingsError> {
        if self == original {
            return Ok(false);
        }
        self.save(path)?;
        Ok(true)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.max_entries == 0 {
            return Err(SettingsError::Invalid(
                "max_entries must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.poll_interval(), Duration::from_secs(1));
        assert_eq!(settings.max_entries, 1000);
        assert!(settings.auto_scroll);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("proxywatch.toml");

        let settings = Settings {
            poll_interval_ms: 250,
            max_entries: 50,
            auto_scroll: false,
            last_log_path: Some(PathBuf::from("/var/log/proxy.log")),
        };
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_unchanged_settings_create_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proxywatch.toml");

        let loaded = Settings::load(&path).unwrap();
        let settings = loaded.clone();
        assert!(!settings.save_if_changed(&loaded, &path).unwrap());
        assert!(!path.exists());

        let changed = Settings {
            auto_scroll: false,
            ..loaded.clone()
        };
        assert!(changed.save_if_changed(&loaded, &path).unwrap());
        assert_eq!(Settings::load(&path).unwrap(), changed);
    }

    #[test]
    fn test_partial_file_uses_defaults_for_the_rest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proxywatch.toml");
        fs::write(&path, "max_entries = 20\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.max_entries, 20);
        assert_eq!(settings.poll_interval_ms, 1000);
        assert!(settings.last_log_path.is_none());
    }

    #[test]
    fn test_zero_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proxywatch.toml");

        fs::write(&path, "poll_interval_ms = 0\n").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Invalid(_))));

        fs::write(&path, "max_entries = 0\n").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proxywatch.toml");
        fs::write(&path, "max_entries = \"many\"\n").unwrap();

        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse { .. })));
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::query::{NoteSort, TaskSort};
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Empty means the profile's data directory
    #[serde(default)]
    pub database_path: String,
    #[serde(default = "default_task_sort")]
    pub default_task_sort: String,
    #[serde(default = "default_note_sort")]
    pub default_note_sort: String,
    /// Used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            default_task_sort: default_task_sort(),
            default_note_sort: default_note_sort(),
            log_level: default_log_level(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

// Default value functions
fn default_task_sort() -> String {
    "due".to_string()
}

fn default_note_sort() -> String {
    "updated".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from an explicit path, creating it with defaults
    /// if missing. `profile` supplies the database location when the file
    /// does not name one.
    pub fn load_from(config_path: &Path, profile: utils::Profile) -> Result<Self, ConfigError> {
        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            toml::from_str(&contents)?
        } else {
            let mut config = Config::default();
            config.save_to(config_path)?;
            config
        };

        if config.database_path.trim().is_empty() {
            config.database_path = Self::default_database_path_for_profile(profile);
        }
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default database path for a specific profile
    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("organizer.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/organizer-dev/organizer.db".to_string(),
                utils::Profile::Prod => "~/.local/share/organizer/organizer.db".to_string(),
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    pub fn task_sort(&self) -> Result<TaskSort, ConfigError> {
        self.default_task_sort
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("default_task_sort: {}", e)))
    }

    pub fn note_sort(&self) -> Result<NoteSort, ConfigError> {
        self.default_note_sort
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("default_note_sort: {}", e)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.task_sort()?;
        self.note_sort()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path, utils::Profile::Dev).expect("load");
        assert!(path.exists());
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.task_sort().expect("sort"), TaskSort::DueDate);
        assert_eq!(config.note_sort().expect("sort"), NoteSort::Updated);
        assert!(config.database_path.ends_with("organizer.db"));

        let written = fs::read_to_string(&path).expect("read");
        assert!(written.contains("config_version = 1"));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "database_path = \"/tmp/organizer-test.db\"\ndefault_task_sort = \"priority\"\n",
        )
        .expect("write");
        let config = Config::load_from(&path, utils::Profile::Prod).expect("load");
        assert_eq!(config.get_database_path(), PathBuf::from("/tmp/organizer-test.db"));
        assert_eq!(config.task_sort().expect("sort"), TaskSort::Priority);
        assert_eq!(config.default_note_sort, "updated");
    }

    #[test]
    fn unknown_sort_names_are_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_note_sort = \"random\"\n").expect("write");
        let err = Config::load_from(&path, utils::Profile::Prod).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_level = [").expect("write");
        assert!(matches!(
            Config::load_from(&path, utils::Profile::Prod),
            Err(ConfigError::ParseError(_))
        ));
    }
}

//! Application facade tying storage, collections, settings, onboarding and
//! backup together.

use std::path::Path;
use thiserror::Error;

use crate::backup::{self, BackupError, ExportDocument, ImportSummary};
use crate::config::Config;
use crate::database::{Database, DatabaseError};
use crate::models::{Contact, FontSize, Note, Section, Settings, Task, Theme};
use crate::onboarding::{self, Onboarding};
use crate::repository::Repository;
use crate::storage::{Storage, keys};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Unknown setting '{0}' (known: {known})", known = SETTING_NAMES.join(", "))]
    UnknownSetting(String),
    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("Failed to save settings")]
    NotSaved,
}

/// Setting names as they appear in the stored JSON
pub const SETTING_NAMES: [&str; 8] = [
    "theme",
    "fontSize",
    "cloudSyncEnabled",
    "cloudService",
    "autoBackup",
    "taskReminders",
    "defaultReminderTime",
    "browserNotifications",
];

/// Set one field of `settings` by name. Names match case-insensitively and
/// ignore `-` and `_`, so `font-size` and `fontSize` are the same setting.
pub fn set_setting(settings: &mut Settings, name: &str, value: &str) -> Result<(), SettingsError> {
    let wanted: String = name
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect();
    let Some(canonical) = SETTING_NAMES
        .iter()
        .copied()
        .find(|n| n.to_lowercase() == wanted)
    else {
        return Err(SettingsError::UnknownSetting(name.to_string()));
    };

    let invalid = |reason: String| SettingsError::InvalidValue {
        name: canonical,
        value: value.to_string(),
        reason,
    };
    let flag = || {
        value
            .trim()
            .parse::<bool>()
            .map_err(|_| invalid("expected true or false".to_string()))
    };

    match canonical {
        "theme" => settings.theme = value.parse::<Theme>().map_err(|e| invalid(e.to_string()))?,
        "fontSize" => {
            settings.font_size = value.parse::<FontSize>().map_err(|e| invalid(e.to_string()))?
        }
        "cloudSyncEnabled" => settings.cloud_sync_enabled = flag()?,
        "cloudService" => {
            let service = value.trim();
            if service.is_empty() {
                return Err(invalid("must not be empty".to_string()));
            }
            settings.cloud_service = service.to_string();
        }
        "autoBackup" => settings.auto_backup = flag()?,
        "taskReminders" => settings.task_reminders = flag()?,
        "defaultReminderTime" => {
            settings.default_reminder_time = value
                .trim()
                .parse()
                .map_err(|_| invalid("expected a number of minutes".to_string()))?
        }
        "browserNotifications" => settings.browser_notifications = flag()?,
        _ => return Err(SettingsError::UnknownSetting(name.to_string())),
    }
    Ok(())
}

pub struct Organizer {
    storage: Storage,
}

impl Organizer {
    /// Open the database named by `config`
    pub fn open(config: &Config) -> Result<Self, DatabaseError> {
        let path = config.get_database_path();
        let db = Database::new(&path.to_string_lossy())?;
        Ok(Self::with_storage(Storage::new(db)))
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::with_storage(Storage::new(Database::in_memory()?)))
    }

    pub fn with_storage(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn contacts(&self) -> Repository<'_, Contact> {
        Repository::load(&self.storage)
    }

    pub fn notes(&self) -> Repository<'_, Note> {
        Repository::load(&self.storage)
    }

    pub fn tasks(&self) -> Repository<'_, Task> {
        Repository::load(&self.storage)
    }

    pub fn settings(&self) -> Settings {
        self.storage.settings()
    }

    /// Change one setting by name and save
    pub fn update_setting(&self, name: &str, value: &str) -> Result<Settings, SettingsError> {
        let mut settings = self.settings();
        set_setting(&mut settings, name, value)?;
        if !self.storage.save_settings(&settings) {
            return Err(SettingsError::NotSaved);
        }
        Ok(settings)
    }

    pub fn onboarding(&self) -> Onboarding<'_> {
        Onboarding::load(&self.storage)
    }

    /// Whether the collections are unlocked
    pub fn is_onboarded(&self) -> bool {
        onboarding::is_completed(&self.storage)
    }

    pub fn reset_onboarding(&self) -> bool {
        onboarding::reset(&self.storage)
    }

    pub fn has_visited(&self, section: Section) -> bool {
        self.storage.flag(&keys::visited(section))
    }

    pub fn export_to(&self, path: &Path) -> Result<ExportDocument, BackupError> {
        backup::export_to(&self.storage, path)
    }

    pub fn import_from(&self, path: &Path) -> Result<ImportSummary, BackupError> {
        backup::import_from(&self.storage, path)
    }

    /// Remove all stored data, onboarding state included
    pub fn clear(&self) -> bool {
        let cleared = self.storage.clear();
        tracing::warn!(cleared, "cleared all data");
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContactDraft;
    use crate::onboarding::Action;

    fn onboarded() -> Organizer {
        let app = Organizer::in_memory().expect("in-memory app");
        let mut flow = app.onboarding();
        for action in [
            Action::Next,
            Action::Next,
            Action::SkipInstall,
            Action::Next,
            Action::Finish,
        ] {
            flow.apply(action).expect("onboarding step");
        }
        app
    }

    #[test]
    fn settings_are_set_by_loose_names() {
        let mut settings = Settings::default();
        set_setting(&mut settings, "font-size", "LARGE").expect("font size");
        set_setting(&mut settings, "default_reminder_time", "30").expect("minutes");
        set_setting(&mut settings, "autobackup", "false").expect("flag");
        assert_eq!(settings.font_size, FontSize::Large);
        assert_eq!(settings.default_reminder_time, 30);
        assert!(!settings.auto_backup);
    }

    #[test]
    fn bad_setting_names_and_values_are_rejected() {
        let mut settings = Settings::default();
        assert!(matches!(
            set_setting(&mut settings, "wallpaper", "blue"),
            Err(SettingsError::UnknownSetting(_))
        ));
        let err = set_setting(&mut settings, "taskReminders", "maybe").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value 'maybe' for taskReminders: expected true or false"
        );
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn update_setting_persists() {
        let app = Organizer::in_memory().expect("in-memory app");
        app.update_setting("theme", "dark").expect("theme");
        assert_eq!(app.settings().theme, Theme::Dark);
    }

    #[test]
    fn finishing_onboarding_marks_every_section_visited() {
        let app = onboarded();
        assert!(app.is_onboarded());
        assert!(Section::ALL.iter().all(|s| app.has_visited(*s)));

        assert!(app.reset_onboarding());
        assert!(!app.is_onboarded());
    }

    #[test]
    fn clear_resets_onboarding_and_collections() {
        let app = onboarded();
        app.contacts()
            .create(ContactDraft::new("Zoe"))
            .expect("create");
        assert!(app.clear());
        assert!(!app.is_onboarded());
        assert!(app.contacts().is_empty());
        assert_eq!(app.settings(), Settings::default());
    }
}

//! JSON key-value persistence.
//!
//! Failures never propagate out of [`Storage`]: reads that cannot be
//! completed or parsed come back as `None`, writes report `false`, and the
//! cause is logged.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::database::DatabaseError;
use crate::models::{Section, Settings};

/// Raw string store underneath [`Storage`]
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>, DatabaseError>;
    fn write(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
    fn delete(&self, key: &str) -> Result<(), DatabaseError>;
}

/// Storage key names
pub(crate) mod keys {
    use crate::models::Section;

    pub const SETTINGS: &str = "organizer_settings";
    pub const ONBOARDING_COMPLETED: &str = "organizer_onboarding_completed";
    pub const ONBOARDING_STEP: &str = "organizer_onboarding_step";
    pub const SETUP_DATA: &str = "organizer_setup_data";

    pub fn collection(section: Section) -> String {
        format!("organizer_{}", section.as_str())
    }

    pub fn sequence(section: Section) -> String {
        format!("organizer_{}_seq", section.as_str())
    }

    pub fn visited(section: Section) -> String {
        format!("organizer_{}_visited", section.as_str())
    }

    /// Every key the application may write
    pub fn all() -> Vec<String> {
        let mut keys: Vec<String> = [SETTINGS, ONBOARDING_COMPLETED, ONBOARDING_STEP, SETUP_DATA]
            .iter()
            .map(|k| k.to_string())
            .collect();
        for section in Section::ALL.iter().copied() {
            keys.push(collection(section));
            keys.push(sequence(section));
            keys.push(visited(section));
        }
        keys
    }
}

pub struct Storage {
    backend: Box<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Read and parse the value under `key`. Absent, unreadable and
    /// unparseable values all read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "error reading from storage");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unparseable stored value");
                None
            }
        }
    }

    /// Serialize and write `value` under `key`
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to serialize value for storage");
                return false;
            }
        };
        match self.backend.write(key, &json) {
            Ok(()) => {
                tracing::trace!(key, bytes = json.len(), "wrote value");
                true
            }
            Err(e) => {
                tracing::error!(key, error = %e, "error writing to storage");
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.backend.delete(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key, error = %e, "error removing from storage");
                false
            }
        }
    }

    /// Remove every application key. Keeps going past individual failures.
    pub fn clear(&self) -> bool {
        keys::all()
            .iter()
            .fold(true, |ok, key| self.remove(key) && ok)
    }

    /// Boolean flags read as `false` unless stored as exactly `true`
    pub fn flag(&self, key: &str) -> bool {
        self.get::<bool>(key) == Some(true)
    }

    /// Stored settings, or the defaults when none are saved
    pub fn settings(&self) -> Settings {
        self.get(keys::SETTINGS).unwrap_or_default()
    }

    pub fn save_settings(&self, settings: &Settings) -> bool {
        self.set(keys::SETTINGS, settings)
    }
}

//! Whole-state export and import as a single JSON document.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::models::{Contact, Note, Section, Settings, Task};
use crate::repository::{Record, Repository, RepositoryError};
use crate::storage::Storage;
use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Failed to read backup file: {0}")]
    ReadError(String),
    #[error("Failed to write backup file: {0}")]
    WriteError(String),
    #[error("Invalid backup file: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("Invalid {section} record in backup (ID {id}): {errors}")]
    InvalidRecord {
        section: Section,
        id: u64,
        errors: ValidationErrors,
    },
    #[error("Failed to save imported settings")]
    SettingsNotSaved,
}

/// Export file layout. Every collection may be missing on import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
}

impl ExportDocument {
    /// Capture everything currently stored
    pub fn snapshot(storage: &Storage, now: DateTime<Utc>) -> Self {
        Self {
            contacts: Repository::<Contact>::load(storage).items().to_vec(),
            notes: Repository::<Note>::load(storage).items().to_vec(),
            tasks: Repository::<Task>::load(storage).items().to_vec(),
            settings: Some(storage.settings()),
            export_date: Some(now),
        }
    }

    pub fn parse(json: &str) -> Result<Self, BackupError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, BackupError> {
        serde_json::to_string_pretty(self).map_err(|e| BackupError::WriteError(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub contacts: usize,
    pub notes: usize,
    pub tasks: usize,
    pub settings: bool,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} contacts, {} notes, {} tasks",
            self.contacts, self.notes, self.tasks
        )?;
        if self.settings {
            f.write_str(", settings replaced")?;
        }
        Ok(())
    }
}

/// `personal-organizer-backup-YYYY-MM-DD.json`
pub fn default_file_name(date: NaiveDate) -> String {
    format!("personal-organizer-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Write a snapshot of `storage` to `path`
pub fn export_to(storage: &Storage, path: &Path) -> Result<ExportDocument, BackupError> {
    let document = ExportDocument::snapshot(storage, Utc::now());
    let json = document.to_json()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| BackupError::WriteError(e.to_string()))?;
        }
    }
    fs::write(path, json).map_err(|e| BackupError::WriteError(e.to_string()))?;
    tracing::info!(
        path = %path.display(),
        contacts = document.contacts.len(),
        notes = document.notes.len(),
        tasks = document.tasks.len(),
        "exported data"
    );
    Ok(document)
}

/// Read and fully parse `path`, then merge it into `storage`
pub fn import_from(storage: &Storage, path: &Path) -> Result<ImportSummary, BackupError> {
    let json = fs::read_to_string(path).map_err(|e| BackupError::ReadError(e.to_string()))?;
    let document = ExportDocument::parse(&json)?;
    restore(storage, document)
}

/// Append the document's records to the stored collections and replace the
/// stored settings with the document's, if it has any.
///
/// Every record is validated before anything is written; one invalid record
/// rejects the whole document. Collections are then written one at a time. A
/// write failure stops the import and earlier collections stay imported.
pub fn restore(storage: &Storage, document: ExportDocument) -> Result<ImportSummary, BackupError> {
    check_records(&document.contacts)?;
    check_records(&document.notes)?;
    check_records(&document.tasks)?;

    let summary = ImportSummary {
        contacts: Repository::<Contact>::load(storage).absorb(document.contacts)?,
        notes: Repository::<Note>::load(storage).absorb(document.notes)?,
        tasks: Repository::<Task>::load(storage).absorb(document.tasks)?,
        settings: document.settings.is_some(),
    };
    if let Some(settings) = document.settings {
        if !storage.save_settings(&settings) {
            return Err(BackupError::SettingsNotSaved);
        }
    }
    tracing::info!(%summary, "imported data");
    Ok(summary)
}

fn check_records<T: Record>(records: &[T]) -> Result<(), BackupError> {
    for record in records {
        record
            .validate()
            .map_err(|errors| BackupError::InvalidRecord {
                section: T::SECTION,
                id: record.id(),
                errors,
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactDraft, NoteDraft, TaskDraft, Theme};
    use crate::storage::tests::memory_storage;
    use tempfile::TempDir;

    fn seeded() -> Storage {
        let storage = memory_storage();
        let mut contacts = Repository::<Contact>::load(&storage);
        contacts.create(ContactDraft::new("Alice Johnson")).expect("contact");
        let mut notes = Repository::<Note>::load(&storage);
        notes.create(NoteDraft::new("Ideas", "- a\n- b")).expect("note");
        let mut tasks = Repository::<Task>::load(&storage);
        tasks
            .create(TaskDraft::new("Plan trip", Utc::now()))
            .expect("task");
        storage.save_settings(&Settings {
            theme: Theme::Dark,
            ..Settings::default()
        });
        storage
    }

    #[test]
    fn file_name_carries_the_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 25).expect("date");
        assert_eq!(
            default_file_name(date),
            "personal-organizer-backup-2024-01-25.json"
        );
    }

    #[test]
    fn export_writes_camel_case_document() {
        let storage = seeded();
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("out").join("backup.json");
        export_to(&storage, &path).expect("export");

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert!(value.get("exportDate").is_some());
        assert_eq!(value["contacts"][0]["name"], "Alice Johnson");
        assert!(value["tasks"][0].get("dueDate").is_some());
        assert_eq!(value["settings"]["theme"], "dark");
    }

    #[test]
    fn import_into_empty_store_contains_everything_exported() {
        let source = seeded();
        let document = ExportDocument::snapshot(&source, Utc::now());

        let target = memory_storage();
        let summary = restore(&target, document.clone()).expect("restore");
        assert_eq!(
            summary,
            ImportSummary {
                contacts: 1,
                notes: 1,
                tasks: 1,
                settings: true,
            }
        );
        let again = ExportDocument::snapshot(&target, Utc::now());
        assert_eq!(again.contacts, document.contacts);
        assert_eq!(again.notes, document.notes);
        assert_eq!(again.tasks, document.tasks);
        assert_eq!(target.settings().theme, Theme::Dark);
    }

    #[test]
    fn reimport_appends_with_fresh_ids() {
        let storage = seeded();
        let document = ExportDocument::snapshot(&storage, Utc::now());
        restore(&storage, document).expect("restore");

        let contacts = Repository::<Contact>::load(&storage);
        let ids: Vec<u64> = contacts.items().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(contacts.items().iter().all(|c| c.name == "Alice Johnson"));
    }

    #[test]
    fn malformed_file_changes_nothing() {
        let storage = seeded();
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{"contacts": [{"id": 9, "name": "Eve"}], "tasks": [{"title": 3}]}"#)
            .expect("write");

        let err = import_from(&storage, &path).unwrap_err();
        assert!(matches!(err, BackupError::ParseError(_)));
        assert_eq!(Repository::<Contact>::load(&storage).len(), 1);
        assert_eq!(Repository::<Task>::load(&storage).len(), 1);
    }

    #[test]
    fn partial_documents_keep_stored_settings() {
        let storage = seeded();
        let document =
            ExportDocument::parse(r#"{"notes": [{"id": 1, "title": "T", "content": "C",
                "createdAt": "2024-01-20T10:00:00Z", "updatedAt": "2024-01-20T10:00:00Z"}]}"#)
                .expect("parse");
        let summary = restore(&storage, document).expect("restore");
        assert_eq!(summary.notes, 1);
        assert!(!summary.settings);
        assert_eq!(storage.settings().theme, Theme::Dark);
    }

    #[test]
    fn invalid_record_rejects_the_whole_document() {
        let storage = seeded();
        let document = ExportDocument::parse(
            r#"{
                "contacts": [{"id": 5, "name": "Bob"}],
                "notes": [{"id": 2, "title": "  ", "content": "Body",
                    "createdAt": "2024-01-20T10:00:00Z", "updatedAt": "2024-01-20T10:00:00Z"}],
                "settings": {"theme": "light"}
            }"#,
        )
        .expect("parse");

        let err = restore(&storage, document).unwrap_err();
        assert!(matches!(
            err,
            BackupError::InvalidRecord { section: Section::Notes, id: 2, ref errors }
                if errors.get("title") == Some("Title is required")
        ));
        assert_eq!(Repository::<Contact>::load(&storage).len(), 1);
        assert_eq!(Repository::<Note>::load(&storage).len(), 1);
        assert_eq!(storage.settings().theme, Theme::Dark);
    }

    #[test]
    fn imported_records_are_normalized() {
        let storage = memory_storage();
        let document = ExportDocument::parse(
            r#"{"tasks": [{"id": 4, "title": "Ship", "dueDate": "2024-03-01",
                "tags": ["Work", "WORK", " urgent "],
                "createdAt": "2024-02-10T00:00:00Z", "updatedAt": "2024-02-01T00:00:00Z"}]}"#,
        )
        .expect("parse");
        restore(&storage, document).expect("restore");

        let tasks = Repository::<Task>::load(&storage);
        let task = tasks.get(4).expect("task");
        assert_eq!(task.tags, vec!["work", "urgent"]);
        assert_eq!(task.updated_at, task.created_at);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let storage = memory_storage();
        let err = import_from(&storage, Path::new("/nonexistent/backup.json")).unwrap_err();
        assert!(matches!(err, BackupError::ReadError(_)));
    }
}

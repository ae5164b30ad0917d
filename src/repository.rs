//! In-memory collections with write-through persistence.
//!
//! A [`Repository`] is loaded once from storage and rewrites its whole
//! collection after every mutation. If that write fails the in-memory state
//! is rolled back, so a failed mutation leaves nothing changed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{
    Contact, ContactDraft, DEFAULT_AVATAR, Note, NoteDraft, Section, Task, TaskDraft,
};
use crate::storage::{Storage, keys};
use crate::utils::normalize_tags;
use crate::validation::{Validate, ValidationErrors};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Validation failed: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error("No {section} entry with ID {id}")]
    NotFound { section: Section, id: u64 },
    #[error("Failed to save {0}; no changes were made")]
    PersistFailed(Section),
}

/// A record type stored as one collection
pub trait Record: Clone + Serialize + DeserializeOwned + Validate {
    type Draft: Validate;

    const SECTION: Section;

    /// Whether new records go to the front of the collection
    const NEWEST_FIRST: bool;

    fn id(&self) -> u64;

    fn set_id(&mut self, id: u64);

    fn from_draft(id: u64, draft: Self::Draft, now: DateTime<Utc>) -> Self;

    /// Overwrite editable fields, keeping identity and creation time
    fn apply_draft(&mut self, draft: Self::Draft, now: DateTime<Utc>);

    /// Bring a record from outside into the shape `from_draft` produces
    fn normalize(&mut self);
}

pub trait Favorite {
    fn toggle_favorite(&mut self, now: DateTime<Utc>);
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Record for Contact {
    type Draft = ContactDraft;
    const SECTION: Section = Section::Contacts;
    const NEWEST_FIRST: bool = false;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn from_draft(id: u64, draft: ContactDraft, _now: DateTime<Utc>) -> Self {
        Contact {
            id,
            name: draft.name.trim().to_string(),
            phone: non_empty(draft.phone),
            email: non_empty(draft.email),
            address: non_empty(draft.address),
            company: non_empty(draft.company),
            notes: non_empty(draft.notes),
            avatar: non_empty(draft.avatar).unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
            favorite: false,
        }
    }

    fn apply_draft(&mut self, draft: ContactDraft, _now: DateTime<Utc>) {
        self.name = draft.name.trim().to_string();
        self.phone = non_empty(draft.phone);
        self.email = non_empty(draft.email);
        self.address = non_empty(draft.address);
        self.company = non_empty(draft.company);
        self.notes = non_empty(draft.notes);
        if let Some(avatar) = non_empty(draft.avatar) {
            self.avatar = avatar;
        }
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
    }
}

impl Favorite for Contact {
    fn toggle_favorite(&mut self, _now: DateTime<Utc>) {
        self.favorite = !self.favorite;
    }
}

impl Record for Note {
    type Draft = NoteDraft;
    const SECTION: Section = Section::Notes;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn from_draft(id: u64, draft: NoteDraft, now: DateTime<Utc>) -> Self {
        Note {
            id,
            title: draft.title.trim().to_string(),
            content: draft.content,
            category: draft.category,
            tags: normalize_tags(&draft.tags),
            favorite: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_draft(&mut self, draft: NoteDraft, now: DateTime<Utc>) {
        self.title = draft.title.trim().to_string();
        self.content = draft.content;
        self.category = draft.category;
        self.tags = normalize_tags(&draft.tags);
        self.updated_at = now.max(self.created_at);
    }

    fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        self.tags = normalize_tags(&self.tags);
        self.updated_at = self.updated_at.max(self.created_at);
    }
}

impl Favorite for Note {
    fn toggle_favorite(&mut self, _now: DateTime<Utc>) {
        self.favorite = !self.favorite;
    }
}

impl Record for Task {
    type Draft = TaskDraft;
    const SECTION: Section = Section::Tasks;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn from_draft(id: u64, draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Task {
            id,
            title: draft.title.trim().to_string(),
            description: non_empty(draft.description),
            completed: false,
            priority: draft.priority,
            // Validated before construction
            due_date: draft.due_date.unwrap_or(now),
            category: draft.category,
            tags: normalize_tags(&draft.tags),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_draft(&mut self, draft: TaskDraft, now: DateTime<Utc>) {
        self.title = draft.title.trim().to_string();
        self.description = non_empty(draft.description);
        self.priority = draft.priority;
        if let Some(due) = draft.due_date {
            self.due_date = due;
        }
        self.category = draft.category;
        self.tags = normalize_tags(&draft.tags);
        self.updated_at = now.max(self.created_at);
    }

    fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        self.tags = normalize_tags(&self.tags);
        self.updated_at = self.updated_at.max(self.created_at);
    }
}

pub struct Repository<'s, T: Record> {
    storage: &'s Storage,
    items: Vec<T>,
    /// Highest ID ever issued in this collection
    last_id: u64,
}

impl<'s, T: Record> Repository<'s, T> {
    /// Load the collection from storage. Missing or unreadable data loads
    /// as an empty collection.
    pub fn load(storage: &'s Storage) -> Self {
        let items: Vec<T> = storage
            .get(&keys::collection(T::SECTION))
            .unwrap_or_default();
        let stored_seq: u64 = storage.get(&keys::sequence(T::SECTION)).unwrap_or(0);
        let max_id = items.iter().map(Record::id).max().unwrap_or(0);
        tracing::debug!(
            section = %T::SECTION,
            count = items.len(),
            last_id = stored_seq.max(max_id),
            "loaded collection"
        );
        Self {
            storage,
            items,
            last_id: stored_seq.max(max_id),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.items.iter().find(|r| r.id() == id)
    }

    fn position(&self, id: u64) -> Result<usize, RepositoryError> {
        self.items
            .iter()
            .position(|r| r.id() == id)
            .ok_or(RepositoryError::NotFound {
                section: T::SECTION,
                id,
            })
    }

    fn persist(&self, seq_changed: bool) -> bool {
        // The counter goes first so a partial write can only skip an ID,
        // never reuse one
        if seq_changed && !self.storage.set(&keys::sequence(T::SECTION), &self.last_id) {
            return false;
        }
        self.storage.set(&keys::collection(T::SECTION), &self.items)
    }

    /// Run `change` and persist, restoring the previous state if either fails
    fn mutate<R>(
        &mut self,
        change: impl FnOnce(&mut Self) -> Result<R, RepositoryError>,
    ) -> Result<R, RepositoryError> {
        let snapshot = (self.items.clone(), self.last_id);
        let result = change(self);
        let outcome = match result {
            Ok(value) => {
                if self.persist(self.last_id != snapshot.1) {
                    return Ok(value);
                }
                Err(RepositoryError::PersistFailed(T::SECTION))
            }
            Err(e) => Err(e),
        };
        self.items = snapshot.0;
        self.last_id = snapshot.1;
        outcome
    }

    fn issue_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    /// Validate and add a new record
    pub fn create(&mut self, draft: T::Draft) -> Result<T, RepositoryError> {
        draft.validate()?;
        let record = self.mutate(|repo| {
            let id = repo.issue_id();
            let record = T::from_draft(id, draft, Utc::now());
            if T::NEWEST_FIRST {
                repo.items.insert(0, record.clone());
            } else {
                repo.items.push(record.clone());
            }
            Ok(record)
        })?;
        // Visited is a hint only; storage logs a failed write
        self.storage.set(&keys::visited(T::SECTION), &true);
        tracing::info!(section = %T::SECTION, id = record.id(), "created record");
        Ok(record)
    }

    /// Validate and replace the editable fields of record `id`
    pub fn update(&mut self, id: u64, draft: T::Draft) -> Result<T, RepositoryError> {
        draft.validate()?;
        let idx = self.position(id)?;
        self.mutate(|repo| {
            let record = &mut repo.items[idx];
            record.apply_draft(draft, Utc::now());
            Ok(record.clone())
        })
    }

    pub fn delete(&mut self, id: u64) -> Result<T, RepositoryError> {
        let idx = self.position(id)?;
        let removed = self.mutate(|repo| Ok(repo.items.remove(idx)))?;
        tracing::info!(section = %T::SECTION, id, "deleted record");
        Ok(removed)
    }

    /// Apply an in-place change to record `id`
    pub fn modify(
        &mut self,
        id: u64,
        change: impl FnOnce(&mut T, DateTime<Utc>),
    ) -> Result<T, RepositoryError> {
        let idx = self.position(id)?;
        self.mutate(|repo| {
            let record = &mut repo.items[idx];
            change(record, Utc::now());
            Ok(record.clone())
        })
    }

    /// Append records from elsewhere. Records whose ID is zero or already
    /// taken get a fresh one; nothing existing is replaced or removed. Any
    /// record failing validation rejects the whole batch.
    pub fn absorb(&mut self, mut records: Vec<T>) -> Result<usize, RepositoryError> {
        if records.is_empty() {
            return Ok(0);
        }
        for record in &mut records {
            record.normalize();
            record.validate()?;
        }
        self.mutate(|repo| {
            let mut taken: HashSet<u64> = repo.items.iter().map(Record::id).collect();
            let count = records.len();
            for mut record in records {
                if record.id() == 0 || taken.contains(&record.id()) {
                    let fresh = repo.issue_id();
                    tracing::debug!(
                        section = %T::SECTION,
                        from = record.id(),
                        to = fresh,
                        "renumbered imported record"
                    );
                    record.set_id(fresh);
                } else {
                    repo.last_id = repo.last_id.max(record.id());
                }
                taken.insert(record.id());
                repo.items.push(record);
            }
            Ok(count)
        })
    }
}

impl<T: Record + Favorite> Repository<'_, T> {
    pub fn toggle_favorite(&mut self, id: u64) -> Result<T, RepositoryError> {
        self.modify(id, |record, now| record.toggle_favorite(now))
    }
}

impl Repository<'_, Task> {
    /// Flip completion and refresh `updated_at`
    pub fn toggle_completed(&mut self, id: u64) -> Result<Task, RepositoryError> {
        self.modify(id, |task, now| {
            task.completed = !task.completed;
            task.updated_at = now.max(task.created_at);
        })
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_AVATAR: &str = "/placeholder.svg?height=40&width=40";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Implements `as_str`, `ALL`, `Display` and case-insensitive `FromStr` for a
/// fieldless enum whose serialized form matches `as_str`.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                        expected: concat!($($name, " "),+),
                    })
            }
        }
    };
}

/// One of the three independent collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Contacts,
    Notes,
    Tasks,
}

string_enum!(Section, "section", {
    Contacts => "contacts",
    Notes => "notes",
    Tasks => "tasks",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_avatar")]
    pub avatar: String,
    #[serde(default)]
    pub favorite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NoteCategory {
    Work,
    #[default]
    Personal,
    Travel,
    Health,
    Learning,
    Hobbies,
}

string_enum!(NoteCategory, "note category", {
    Work => "Work",
    Personal => "Personal",
    Travel => "Travel",
    Health => "Health",
    Learning => "Learning",
    Hobbies => "Hobbies",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: u64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: NoteCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

string_enum!(Priority, "priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

impl Priority {
    /// Sort rank: high=3, medium=2, low=1
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskCategory {
    Work,
    #[default]
    Personal,
    Health,
    Learning,
    Home,
}

string_enum!(TaskCategory, "task category", {
    Work => "Work",
    Personal => "Personal",
    Health => "Health",
    Learning => "Learning",
    Home => "Home",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(deserialize_with = "crate::utils::deserialize_timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub category: TaskCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Not completed and past due at `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date < now
    }

    /// Not completed and due on the same UTC calendar day as `now`
    pub fn is_due_today(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.date_naive() == now.date_naive()
    }
}

/// Field values for creating or editing a contact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDraft {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    /// Keeps the existing avatar on edit when `None`
    pub avatar: Option<String>,
}

impl ContactDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Field values for creating or editing a note
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub category: NoteCategory,
    pub tags: Vec<String>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Field values for creating or editing a task. `due_date` is optional here
/// only so that a missing value surfaces as a validation error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub category: TaskCategory,
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, due_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            due_date: Some(due_date),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

string_enum!(Theme, "theme", {
    System => "system",
    Light => "light",
    Dark => "dark",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

string_enum!(FontSize, "font size", {
    Small => "small",
    Medium => "medium",
    Large => "large",
});

/// User preferences. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: Theme,
    pub font_size: FontSize,
    pub cloud_sync_enabled: bool,
    pub cloud_service: String,
    pub auto_backup: bool,
    pub task_reminders: bool,
    /// Minutes before the due time
    pub default_reminder_time: u32,
    pub browser_notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            font_size: FontSize::Medium,
            cloud_sync_enabled: false,
            cloud_service: "google".to_string(),
            auto_backup: true,
            task_reminders: true,
            default_reminder_time: 15,
            browser_notifications: false,
        }
    }
}

/// Choices captured on the onboarding setup step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetupData {
    pub enable_sync: bool,
    pub cloud_service: String,
    pub import_data: bool,
}

impl Default for SetupData {
    fn default() -> Self {
        Self {
            enable_sync: false,
            cloud_service: "google".to_string(),
            import_data: false,
        }
    }
}

fn default_avatar() -> String {
    DEFAULT_AVATAR.to_string()
}

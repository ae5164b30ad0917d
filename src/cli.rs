use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::app::{Organizer, SettingsError};
use crate::backup::{BackupError, default_file_name};
use crate::config::{Config, ConfigError};
use crate::models::{
    Contact, ContactDraft, Note, NoteCategory, NoteDraft, Priority, Section, SetupData, Task,
    TaskCategory, TaskDraft,
};
use crate::onboarding::{Action, Exit, OnboardingError, Step, Transition};
use crate::query::{
    ContactQuery, ContactStats, NoteQuery, NoteSort, NoteStats, StatusFilter, TaskQuery, TaskSort,
    TaskStats,
};
use crate::repository::RepositoryError;
use crate::utils::{format_tags_brackets, parse_tags, parse_timestamp};

#[derive(Parser)]
#[command(name = "organizer")]
#[command(about = "Personal organizer - contacts, notes and tasks")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    /// Show an overview if no subcommand is given
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage contacts
    Contacts {
        #[command(subcommand)]
        action: ContactCommand,
    },
    /// Manage notes
    Notes {
        #[command(subcommand)]
        action: NoteCommand,
    },
    /// Manage tasks
    Tasks {
        #[command(subcommand)]
        action: TaskCommand,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Write all data to a JSON backup file
    Export {
        /// Output path (default: personal-organizer-backup-YYYY-MM-DD.json)
        path: Option<PathBuf>,
    },
    /// Merge a JSON backup file into the stored data
    Import {
        path: PathBuf,
    },
    /// Delete all stored data, onboarding included
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Walk through first-run setup
    Onboarding {
        #[command(subcommand)]
        action: OnboardingCommand,
    },
}

#[derive(Args)]
pub struct ContactFields {
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    /// Free-form notes about the contact
    #[arg(long)]
    pub notes: Option<String>,
    /// Avatar image URL or path
    #[arg(long)]
    pub avatar: Option<String>,
}

#[derive(Subcommand)]
pub enum ContactCommand {
    /// Add a contact
    Add {
        name: String,
        #[command(flatten)]
        fields: ContactFields,
    },
    /// Edit a contact; an empty value clears an optional field
    Edit {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ContactFields,
    },
    /// Delete a contact
    Rm { id: u64 },
    /// Toggle favorite
    Fav { id: u64 },
    /// List contacts grouped by initial
    List {
        /// Search name, phone, email, address, company and notes
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        favorites: bool,
        /// One alphabetical list without initial headings
        #[arg(long)]
        flat: bool,
    },
    /// Show one contact
    Show { id: u64 },
    /// Contact counts
    Stats,
}

#[derive(Subcommand)]
pub enum NoteCommand {
    /// Add a note
    Add {
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        category: Option<NoteCategory>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Edit a note
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<NoteCategory>,
        /// Comma-separated tags, replacing the current ones
        #[arg(long)]
        tags: Option<String>,
    },
    /// Delete a note
    Rm { id: u64 },
    /// Toggle favorite
    Fav { id: u64 },
    /// List notes
    List {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<NoteCategory>,
        /// Only notes carrying this tag (repeatable, all must match)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        favorites: bool,
        /// updated, created or title
        #[arg(long)]
        sort: Option<NoteSort>,
    },
    /// Show one note
    Show { id: u64 },
    /// Note counts and tags in use
    Stats,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a task
    Add {
        title: String,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        category: Option<TaskCategory>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Edit a task
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        category: Option<TaskCategory>,
        /// Comma-separated tags, replacing the current ones
        #[arg(long)]
        tags: Option<String>,
    },
    /// Delete a task
    Rm { id: u64 },
    /// Toggle completion
    Done { id: u64 },
    /// List tasks
    List {
        #[arg(short, long)]
        search: Option<String>,
        /// all, active, completed or overdue
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        #[arg(long)]
        category: Option<TaskCategory>,
        /// Only tasks carrying this tag (repeatable, all must match)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// due, priority, created or updated
        #[arg(long)]
        sort: Option<TaskSort>,
    },
    /// Show one task
    Show { id: u64 },
    /// Task counts
    Stats,
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Print current settings
    Show,
    /// Change one setting, e.g. `settings set theme dark`
    Set { name: String, value: String },
}

#[derive(Subcommand)]
pub enum OnboardingCommand {
    /// Show the current step
    Status,
    Next,
    Back,
    /// Install the app (on the install step)
    Install,
    /// Skip installing (on the install step)
    Skip,
    /// Record setup choices (on the setup step)
    Setup {
        /// Enable cloud sync
        #[arg(long)]
        sync: bool,
        #[arg(long, default_value = "google")]
        cloud_service: String,
        /// Import existing data
        #[arg(long)]
        import_data: bool,
    },
    /// Finish onboarding
    Finish,
    /// Finish onboarding and start adding to a section
    Open { section: Section },
    /// Run onboarding again
    Reset,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error(transparent)]
    RepositoryError(#[from] RepositoryError),
    #[error(transparent)]
    OnboardingError(#[from] OnboardingError),
    #[error(transparent)]
    BackupError(#[from] BackupError),
    #[error(transparent)]
    SettingsError(#[from] SettingsError),
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    #[error("Onboarding is not finished; run `organizer onboarding status` to continue")]
    OnboardingRequired,
    #[error("Refusing to clear all data without --yes")]
    ConfirmationRequired,
    #[error("Failed to {0}")]
    StorageFailed(&'static str),
    #[error("Failed to format output: {0}")]
    FormatError(#[from] serde_json::Error),
}

/// Dispatch a parsed command
pub fn run(command: Option<Commands>, app: &Organizer, config: &Config) -> Result<(), CliError> {
    let Some(command) = command else {
        return handle_overview(app);
    };
    match command {
        Commands::Contacts { action } => {
            require_onboarding(app)?;
            handle_contacts(action, app)
        }
        Commands::Notes { action } => {
            require_onboarding(app)?;
            handle_notes(action, app, config)
        }
        Commands::Tasks { action } => {
            require_onboarding(app)?;
            handle_tasks(action, app, config)
        }
        Commands::Settings { action } => handle_settings(action, app),
        Commands::Export { path } => handle_export(path, app),
        Commands::Import { path } => handle_import(&path, app),
        Commands::Clear { yes } => handle_clear(yes, app),
        Commands::Onboarding { action } => handle_onboarding(action, app),
    }
}

fn require_onboarding(app: &Organizer) -> Result<(), CliError> {
    if app.is_onboarded() {
        Ok(())
    } else {
        Err(CliError::OnboardingRequired)
    }
}

fn parse_due(due: &str) -> Result<DateTime<Utc>, CliError> {
    parse_timestamp(due)
        .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", due, e)))
}

fn handle_overview(app: &Organizer) -> Result<(), CliError> {
    if !app.is_onboarded() {
        println!("Welcome! Run `organizer onboarding status` to get started.");
        return Ok(());
    }
    let now = Utc::now();
    let contacts = ContactStats::compute(app.contacts().items());
    let notes = NoteStats::compute(app.notes().items(), now);
    let tasks = TaskStats::compute(app.tasks().items(), now);
    println!(
        "Contacts: {} ({} favorites)",
        contacts.total, contacts.favorites
    );
    println!("Notes:    {} ({} favorites)", notes.total, notes.favorites);
    println!(
        "Tasks:    {} ({} active, {} overdue, {} due today)",
        tasks.total, tasks.active, tasks.overdue, tasks.due_today
    );
    Ok(())
}

fn contact_line(contact: &Contact) -> String {
    let mut line = format!(
        "#{} {}{}",
        contact.id,
        if contact.favorite { "* " } else { "" },
        contact.name
    );
    for value in [&contact.email, &contact.phone, &contact.company]
        .into_iter()
        .flatten()
    {
        line.push_str("  ");
        line.push_str(value);
    }
    line
}

fn apply_contact_fields(draft: &mut ContactDraft, fields: ContactFields) {
    let ContactFields {
        phone,
        email,
        address,
        company,
        notes,
        avatar,
    } = fields;
    for (slot, value) in [
        (&mut draft.phone, phone),
        (&mut draft.email, email),
        (&mut draft.address, address),
        (&mut draft.company, company),
        (&mut draft.notes, notes),
        (&mut draft.avatar, avatar),
    ] {
        if value.is_some() {
            *slot = value;
        }
    }
}

/// Handle `contacts` subcommands
pub fn handle_contacts(action: ContactCommand, app: &Organizer) -> Result<(), CliError> {
    let mut contacts = app.contacts();
    match action {
        ContactCommand::Add { name, fields } => {
            let mut draft = ContactDraft::new(name);
            apply_contact_fields(&mut draft, fields);
            let contact = contacts.create(draft)?;
            println!("Contact created successfully (ID: {})", contact.id);
        }
        ContactCommand::Edit { id, name, fields } => {
            let existing = contacts.get(id).cloned().ok_or(RepositoryError::NotFound {
                section: Section::Contacts,
                id,
            })?;
            let mut draft = ContactDraft {
                name: name.unwrap_or(existing.name),
                phone: existing.phone,
                email: existing.email,
                address: existing.address,
                company: existing.company,
                notes: existing.notes,
                avatar: None,
            };
            apply_contact_fields(&mut draft, fields);
            contacts.update(id, draft)?;
            println!("Contact updated successfully (ID: {})", id);
        }
        ContactCommand::Rm { id } => {
            let removed = contacts.delete(id)?;
            println!("Deleted contact {} (ID: {})", removed.name, id);
        }
        ContactCommand::Fav { id } => {
            let contact = contacts.toggle_favorite(id)?;
            let state = if contact.favorite { "added to" } else { "removed from" };
            println!("{} {} favorites", contact.name, state);
        }
        ContactCommand::List {
            search,
            favorites,
            flat,
        } => {
            let query = ContactQuery {
                text: search.unwrap_or_default(),
                favorites_only: favorites,
            };
            let view = query.apply(contacts.items());
            if view.is_empty() {
                println!("No contacts found");
            } else if flat {
                for contact in view {
                    println!("{}", contact_line(contact));
                }
            } else {
                for (initial, members) in query.grouped(contacts.items()) {
                    println!("{}", initial);
                    for contact in members {
                        println!("  {}", contact_line(contact));
                    }
                }
            }
        }
        ContactCommand::Show { id } => {
            let contact = contacts.get(id).ok_or(RepositoryError::NotFound {
                section: Section::Contacts,
                id,
            })?;
            println!("{}", contact.name);
            println!("  ID:       {}", contact.id);
            println!("  Favorite: {}", if contact.favorite { "yes" } else { "no" });
            for (label, value) in [
                ("Phone", &contact.phone),
                ("Email", &contact.email),
                ("Address", &contact.address),
                ("Company", &contact.company),
                ("Notes", &contact.notes),
            ] {
                if let Some(value) = value {
                    println!("  {:<9} {}", format!("{}:", label), value);
                }
            }
            println!("  Avatar:   {}", contact.avatar);
        }
        ContactCommand::Stats => {
            let stats = ContactStats::compute(contacts.items());
            println!("Total:     {}", stats.total);
            println!("Favorites: {}", stats.favorites);
            println!("Company:   {}", stats.with_company);
            println!("Phone:     {}", stats.with_phone);
        }
    }
    Ok(())
}

fn note_line(note: &Note) -> String {
    let mut line = format!(
        "#{} {}{} ({}, updated {})",
        note.id,
        if note.favorite { "* " } else { "" },
        note.title,
        note.category,
        note.updated_at.format("%Y-%m-%d")
    );
    if !note.tags.is_empty() {
        line.push(' ');
        line.push_str(&format_tags_brackets(&note.tags));
    }
    line
}

/// Handle `notes` subcommands
pub fn handle_notes(action: NoteCommand, app: &Organizer, config: &Config) -> Result<(), CliError> {
    let mut notes = app.notes();
    match action {
        NoteCommand::Add {
            title,
            content,
            category,
            tags,
        } => {
            let draft = NoteDraft {
                category: category.unwrap_or_default(),
                tags: parse_tags(tags.as_deref()),
                ..NoteDraft::new(title, content)
            };
            let note = notes.create(draft)?;
            println!("Note created successfully (ID: {})", note.id);
        }
        NoteCommand::Edit {
            id,
            title,
            content,
            category,
            tags,
        } => {
            let existing = notes.get(id).cloned().ok_or(RepositoryError::NotFound {
                section: Section::Notes,
                id,
            })?;
            let draft = NoteDraft {
                title: title.unwrap_or(existing.title),
                content: content.unwrap_or(existing.content),
                category: category.unwrap_or(existing.category),
                tags: match tags {
                    Some(tags) => parse_tags(Some(tags.as_str())),
                    None => existing.tags,
                },
            };
            notes.update(id, draft)?;
            println!("Note updated successfully (ID: {})", id);
        }
        NoteCommand::Rm { id } => {
            let removed = notes.delete(id)?;
            println!("Deleted note {} (ID: {})", removed.title, id);
        }
        NoteCommand::Fav { id } => {
            let note = notes.toggle_favorite(id)?;
            let state = if note.favorite { "added to" } else { "removed from" };
            println!("{} {} favorites", note.title, state);
        }
        NoteCommand::List {
            search,
            category,
            tags,
            favorites,
            sort,
        } => {
            let query = NoteQuery {
                text: search.unwrap_or_default(),
                category,
                tags: crate::utils::normalize_tags(&tags),
                favorites_only: favorites,
                sort: match sort {
                    Some(sort) => sort,
                    None => config.note_sort()?,
                },
            };
            let view = query.apply(notes.items());
            if view.is_empty() {
                println!("No notes found");
            }
            for note in view {
                println!("{}", note_line(note));
            }
        }
        NoteCommand::Show { id } => {
            let note = notes.get(id).ok_or(RepositoryError::NotFound {
                section: Section::Notes,
                id,
            })?;
            println!("{}", note_line(note));
            println!("Created: {}", note.created_at.format("%Y-%m-%d %H:%M"));
            println!();
            println!("{}", note.content);
        }
        NoteCommand::Stats => {
            let stats = NoteStats::compute(notes.items(), Utc::now());
            println!("Total:     {}", stats.total);
            println!("Favorites: {}", stats.favorites);
            println!("This week: {}", stats.this_week);
            if !stats.tags.is_empty() {
                println!("Tags:      {}", format_tags_brackets(&stats.tags));
            }
        }
    }
    Ok(())
}

fn task_line(task: &Task, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "[{}] #{} {} (due {}, {}, {})",
        if task.completed { "x" } else { " " },
        task.id,
        task.title,
        task.due_date.format("%Y-%m-%d"),
        task.priority,
        task.category
    );
    if !task.tags.is_empty() {
        line.push(' ');
        line.push_str(&format_tags_brackets(&task.tags));
    }
    if task.is_overdue(now) {
        line.push_str(" OVERDUE");
    }
    line
}

/// Handle `tasks` subcommands
pub fn handle_tasks(action: TaskCommand, app: &Organizer, config: &Config) -> Result<(), CliError> {
    let mut tasks = app.tasks();
    let now = Utc::now();
    match action {
        TaskCommand::Add {
            title,
            due,
            description,
            priority,
            category,
            tags,
        } => {
            let draft = TaskDraft {
                description,
                priority: priority.unwrap_or_default(),
                category: category.unwrap_or_default(),
                tags: parse_tags(tags.as_deref()),
                ..TaskDraft::new(title, parse_due(&due)?)
            };
            let task = tasks.create(draft)?;
            println!("Task created successfully (ID: {})", task.id);
        }
        TaskCommand::Edit {
            id,
            title,
            due,
            description,
            priority,
            category,
            tags,
        } => {
            let existing = tasks.get(id).cloned().ok_or(RepositoryError::NotFound {
                section: Section::Tasks,
                id,
            })?;
            let due_date = match due {
                Some(due) => parse_due(&due)?,
                None => existing.due_date,
            };
            let draft = TaskDraft {
                title: title.unwrap_or(existing.title),
                description: description.or(existing.description),
                priority: priority.unwrap_or(existing.priority),
                due_date: Some(due_date),
                category: category.unwrap_or(existing.category),
                tags: match tags {
                    Some(tags) => parse_tags(Some(tags.as_str())),
                    None => existing.tags,
                },
            };
            tasks.update(id, draft)?;
            println!("Task updated successfully (ID: {})", id);
        }
        TaskCommand::Rm { id } => {
            let removed = tasks.delete(id)?;
            println!("Deleted task {} (ID: {})", removed.title, id);
        }
        TaskCommand::Done { id } => {
            let task = tasks.toggle_completed(id)?;
            let state = if task.completed { "completed" } else { "reopened" };
            println!("Task {} {} (ID: {})", task.title, state, id);
        }
        TaskCommand::List {
            search,
            status,
            category,
            tags,
            sort,
        } => {
            let query = TaskQuery {
                text: search.unwrap_or_default(),
                status,
                category,
                tags: crate::utils::normalize_tags(&tags),
                sort: match sort {
                    Some(sort) => sort,
                    None => config.task_sort()?,
                },
                now,
            };
            let view = query.apply(tasks.items());
            if view.is_empty() {
                println!("No tasks found");
            }
            for task in view {
                println!("{}", task_line(task, now));
            }
        }
        TaskCommand::Show { id } => {
            let task = tasks.get(id).ok_or(RepositoryError::NotFound {
                section: Section::Tasks,
                id,
            })?;
            println!("{}", task_line(task, now));
            if let Some(description) = &task.description {
                println!();
                println!("{}", description);
            }
        }
        TaskCommand::Stats => {
            let stats = TaskStats::compute(tasks.items(), now);
            println!("Total:     {}", stats.total);
            println!("Active:    {}", stats.active);
            println!("Completed: {}", stats.completed);
            println!("Overdue:   {}", stats.overdue);
            println!("Due today: {}", stats.due_today);
        }
    }
    Ok(())
}

/// Handle `settings` subcommands
pub fn handle_settings(action: SettingsCommand, app: &Organizer) -> Result<(), CliError> {
    let settings = match action {
        SettingsCommand::Show => app.settings(),
        SettingsCommand::Set { name, value } => {
            let settings = app.update_setting(&name, &value)?;
            println!("Setting {} updated", name);
            settings
        }
    };
    let json = serde_json::to_string_pretty(&settings)?;
    println!("{}", json);
    Ok(())
}

fn handle_export(path: Option<PathBuf>, app: &Organizer) -> Result<(), CliError> {
    let path = path.unwrap_or_else(|| PathBuf::from(default_file_name(Utc::now().date_naive())));
    let document = app.export_to(&path)?;
    println!(
        "Exported {} contacts, {} notes, {} tasks to {}",
        document.contacts.len(),
        document.notes.len(),
        document.tasks.len(),
        path.display()
    );
    Ok(())
}

fn handle_import(path: &Path, app: &Organizer) -> Result<(), CliError> {
    let summary = app.import_from(path)?;
    println!("Imported {} from {}", summary, path.display());
    Ok(())
}

fn handle_clear(yes: bool, app: &Organizer) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::ConfirmationRequired);
    }
    if !app.clear() {
        return Err(CliError::StorageFailed("clear stored data"));
    }
    println!("All data cleared");
    Ok(())
}

fn print_step(step: Step) {
    println!(
        "Step {}/{} ({}%): {}",
        step.number(),
        Step::ALL.len(),
        step.percent(),
        step
    );
    println!("Available: {}", step.allowed().join(", "));
}

fn print_setup(setup: &SetupData) {
    let sync = if setup.enable_sync {
        format!("on ({})", setup.cloud_service)
    } else {
        "off".to_string()
    };
    let import = if setup.import_data { "on" } else { "off" };
    println!("Setup: sync {}, import {}", sync, import);
}

/// Handle `onboarding` subcommands
pub fn handle_onboarding(action: OnboardingCommand, app: &Organizer) -> Result<(), CliError> {
    let mut flow = app.onboarding();
    let action = match action {
        OnboardingCommand::Status => {
            if flow.is_completed() {
                println!("Onboarding completed");
            } else {
                print_step(flow.step());
            }
            print_setup(flow.setup());
            return Ok(());
        }
        OnboardingCommand::Reset => {
            if !app.reset_onboarding() {
                return Err(CliError::StorageFailed("reset onboarding"));
            }
            println!("Onboarding reset");
            return Ok(());
        }
        OnboardingCommand::Setup {
            sync,
            cloud_service,
            import_data,
        } => {
            flow.configure(SetupData {
                enable_sync: sync,
                cloud_service,
                import_data,
            })?;
            println!("Setup choices saved");
            return Ok(());
        }
        OnboardingCommand::Next => Action::Next,
        OnboardingCommand::Back => Action::Back,
        OnboardingCommand::Install => Action::Install,
        OnboardingCommand::Skip => Action::SkipInstall,
        OnboardingCommand::Finish => Action::Finish,
        OnboardingCommand::Open { section } => Action::OpenSection(section),
    };

    match flow.apply(action)? {
        Transition::Moved(step) => print_step(step),
        Transition::Finished(Exit::Home) => println!("Onboarding completed"),
        Transition::Finished(Exit::CreateIn(section)) => {
            println!("Onboarding completed");
            println!("Add your first entry with `organizer {} add`", section);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_failures_are_not_storage_failures() {
        let err = serde_json::from_str::<u8>("x").unwrap_err();
        let err = CliError::from(err);
        assert!(matches!(err, CliError::FormatError(_)));
        assert!(err.to_string().starts_with("Failed to format output"));
    }
}

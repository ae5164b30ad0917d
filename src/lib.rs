pub mod app;
pub mod backup;
pub mod cli;
pub mod config;
pub mod database;
pub mod models;
pub mod onboarding;
pub mod query;
pub mod repository;
pub mod storage;
pub mod utils;
pub mod validation;

pub use app::Organizer;
pub use config::Config;
pub use database::Database;
pub use models::{Contact, Note, Settings, Task};
pub use repository::{Repository, RepositoryError};
pub use storage::Storage;
pub use utils::Profile;

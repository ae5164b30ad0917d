use chrono::{DateTime, NaiveDate, Utc};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "organizer-dev",
            Profile::Prod => "organizer",
        }
    }
}

/// Get the configuration directory path for the organizer
/// If profile is Dev, uses "organizer-dev" instead of "organizer"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    // Use "com" as qualifier for better cross-platform compatibility
    ProjectDirs::from("com", "organizer", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path for the organizer
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "organizer", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
}

/// Parse a timestamp given either as RFC 3339 or as a bare YYYY-MM-DD date.
/// Bare dates are taken as midnight UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let value = value.trim();
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => match parse_date(value) {
            Ok(date) => Ok(date.and_time(chrono::NaiveTime::MIN).and_utc()),
            Err(_) => Err(rfc_err),
        },
    }
}

/// Serde helper for timestamps that may have been written as bare dates
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Normalize a list of tags: trimmed, lowercased, empty entries and
/// duplicates dropped, first-seen order kept
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

/// Parse tags from a comma-separated string
pub fn parse_tags(tags: Option<&str>) -> Vec<String> {
    match tags {
        Some(tags_str) if !tags_str.trim().is_empty() => normalize_tags(tags_str.split(',')),
        _ => Vec::new(),
    }
}

/// Format tags as a string with brackets: [tag1] [tag2] [tag3]
pub fn format_tags_brackets(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("[{}]", tag))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn bare_dates_parse_as_midnight_utc() {
        let ts = parse_timestamp("2024-01-25").expect("date should parse");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 1, 25));
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn rfc3339_timestamps_keep_their_instant() {
        let ts = parse_timestamp("2024-01-20T10:00:00.000Z").expect("timestamp should parse");
        assert_eq!(ts.hour(), 10);
        assert!(parse_timestamp("next tuesday").is_err());
    }

    #[test]
    fn tags_are_lowercased_and_deduplicated_in_order() {
        let tags = parse_tags(Some(" Work, urgent ,work,, Q3 "));
        assert_eq!(tags, vec!["work", "urgent", "q3"]);
        assert!(parse_tags(Some("   ")).is_empty());
        assert!(parse_tags(None).is_empty());
    }

    #[test]
    fn brackets_format() {
        let tags = vec!["a".to_string(), "b".to_string()];
        assert_eq!(format_tags_brackets(&tags), "[a] [b]");
    }
}

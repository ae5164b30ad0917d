use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use super::{Searchable, ViewQuery, compare_text, derive_view, has_all_tags};
use crate::models::{Note, NoteCategory, ParseEnumError};

impl Searchable for Note {
    fn any_search_field(&self, pred: &mut dyn FnMut(&str) -> bool) -> bool {
        pred(self.title.as_str())
            || pred(self.content.as_str())
            || self.tags.iter().any(|tag| pred(tag.as_str()))
            || pred(self.category.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteSort {
    /// Most recently updated first
    #[default]
    Updated,
    /// Most recently created first
    Created,
    Title,
}

impl FromStr for NoteSort {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "updated" => Ok(NoteSort::Updated),
            "created" => Ok(NoteSort::Created),
            "title" => Ok(NoteSort::Title),
            _ => Err(ParseEnumError {
                kind: "note sort",
                value: s.to_string(),
                expected: "updated created title",
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoteQuery {
    pub text: String,
    /// `None` means every category
    pub category: Option<NoteCategory>,
    /// A note must carry all of these
    pub tags: Vec<String>,
    pub favorites_only: bool,
    pub sort: NoteSort,
}

impl NoteQuery {
    pub fn apply<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        derive_view(notes, self)
    }
}

impl ViewQuery<Note> for NoteQuery {
    fn text(&self) -> &str {
        &self.text
    }

    fn admits(&self, note: &Note) -> bool {
        self.category.is_none_or(|c| note.category == c)
            && has_all_tags(&note.tags, &self.tags)
            && (!self.favorites_only || note.favorite)
    }

    fn compare(&self, a: &Note, b: &Note) -> Ordering {
        match self.sort {
            NoteSort::Updated => b.updated_at.cmp(&a.updated_at),
            NoteSort::Created => b.created_at.cmp(&a.created_at),
            NoteSort::Title => compare_text(&a.title, &b.title),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoteStats {
    pub total: usize,
    pub favorites: usize,
    /// Updated within the seven days before `now`
    pub this_week: usize,
    /// Every tag in use, sorted and unique
    pub tags: Vec<String>,
}

impl NoteStats {
    pub fn compute(notes: &[Note], now: DateTime<Utc>) -> Self {
        let week_ago = now - Duration::days(7);
        let tags: BTreeSet<&str> = notes
            .iter()
            .flat_map(|n| n.tags.iter().map(String::as_str))
            .collect();
        Self {
            total: notes.len(),
            favorites: notes.iter().filter(|n| n.favorite).count(),
            this_week: notes.iter().filter(|n| n.updated_at > week_ago).count(),
            tags: tags.into_iter().map(str::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn note(id: u64, title: &str, category: NoteCategory, tags: &[&str], age_days: i64) -> Note {
        let base = Utc.with_ymd_and_hms(2024, 1, 20, 10, 0, 0).unwrap();
        Note {
            id,
            title: title.to_string(),
            content: format!("Body of {}", title),
            category,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            favorite: false,
            created_at: base - Duration::days(age_days + 10),
            updated_at: base - Duration::days(age_days),
        }
    }

    fn sample() -> Vec<Note> {
        vec![
            note(1, "Meeting Notes - Q1 Planning", NoteCategory::Work, &["meeting", "planning", "q1"], 3),
            note(2, "Recipe: Grandma's Chocolate Chip Cookies", NoteCategory::Personal, &["recipe", "baking"], 1),
            note(3, "Book Ideas", NoteCategory::Personal, &["writing", "ideas"], 7),
            note(4, "Travel Plans - Japan", NoteCategory::Travel, &["travel", "japan", "planning"], 2),
        ]
    }

    fn ids(view: &[&Note]) -> Vec<u64> {
        view.iter().map(|n| n.id).collect()
    }

    #[test]
    fn default_view_is_most_recently_updated_first() {
        let notes = sample();
        assert_eq!(ids(&NoteQuery::default().apply(&notes)), vec![2, 4, 1, 3]);
    }

    #[test]
    fn search_reaches_tags_and_category() {
        let notes = sample();
        let query = NoteQuery {
            text: "JAPAN".to_string(),
            ..NoteQuery::default()
        };
        assert_eq!(ids(&query.apply(&notes)), vec![4]);

        let query = NoteQuery {
            text: "work".to_string(),
            ..NoteQuery::default()
        };
        assert_eq!(ids(&query.apply(&notes)), vec![1]);
    }

    #[test]
    fn category_and_tags_combine_with_and() {
        let notes = sample();
        let query = NoteQuery {
            tags: vec!["planning".to_string()],
            ..NoteQuery::default()
        };
        assert_eq!(ids(&query.apply(&notes)), vec![4, 1]);

        let query = NoteQuery {
            tags: vec!["planning".to_string(), "japan".to_string()],
            ..NoteQuery::default()
        };
        assert_eq!(ids(&query.apply(&notes)), vec![4]);

        let query = NoteQuery {
            category: Some(NoteCategory::Work),
            tags: vec!["japan".to_string()],
            ..NoteQuery::default()
        };
        assert!(query.apply(&notes).is_empty());
    }

    #[test]
    fn alternative_sorts() {
        let notes = sample();
        let by_title = NoteQuery {
            sort: NoteSort::Title,
            ..NoteQuery::default()
        };
        assert_eq!(ids(&by_title.apply(&notes)), vec![3, 1, 2, 4]);

        let by_created = NoteQuery {
            sort: "created".parse().expect("sort key"),
            ..NoteQuery::default()
        };
        assert_eq!(ids(&by_created.apply(&notes)), vec![2, 4, 1, 3]);
        assert!("priority".parse::<NoteSort>().is_err());
    }

    #[test]
    fn stats_collect_sorted_unique_tags() {
        let mut notes = sample();
        notes[0].favorite = true;
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 10, 0, 0).unwrap();
        let stats = NoteStats::compute(&notes, now);
        // updated 1, 2 and 3 days ago; the 7-day-old note is on the boundary
        assert_eq!(stats.this_week, 3);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.favorites, 1);
        assert_eq!(
            stats.tags,
            vec!["baking", "ideas", "japan", "meeting", "planning", "q1", "recipe", "travel", "writing"]
        );
    }
}

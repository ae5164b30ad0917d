//! Derived views over a collection: free-text search, exact-match filters
//! and a stable sort, shared by contacts, notes and tasks.

use std::cmp::Ordering;

pub mod contacts;
pub mod notes;
pub mod tasks;

pub use contacts::{ContactQuery, ContactStats, group_by_initial, initial_of};
pub use notes::{NoteQuery, NoteSort, NoteStats};
pub use tasks::{StatusFilter, TaskQuery, TaskSort, TaskStats};

/// A record that exposes a fixed list of string fields to free-text search
pub trait Searchable {
    /// True if `pred` holds for any searchable field value. Absent optional
    /// fields are skipped.
    fn any_search_field(&self, pred: &mut dyn FnMut(&str) -> bool) -> bool;

    /// Whether any searchable field contains `needle`, which must already be
    /// lowercased
    fn matches_folded(&self, needle: &str) -> bool {
        self.any_search_field(&mut |field: &str| field.to_lowercase().contains(needle))
    }
}

/// Query parameters applied to a collection of `T`
pub trait ViewQuery<T> {
    /// Free-text query. Blank means no text filtering.
    fn text(&self) -> &str;

    /// Exact-match filters, ANDed with the text query
    fn admits(&self, record: &T) -> bool;

    /// Ordering of the derived view
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

fn fold_query(query: &str) -> Option<String> {
    let folded = query.trim().to_lowercase();
    (!folded.is_empty()).then_some(folded)
}

/// Records matching `query` case-insensitively in any searchable field,
/// in collection order. A blank query returns every record.
pub fn search<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<&'a T> {
    match fold_query(query) {
        None => items.iter().collect(),
        Some(needle) => items.iter().filter(|r| r.matches_folded(&needle)).collect(),
    }
}

/// Search, filter and sort `items` by `query`. The sort is stable, so ties
/// keep collection order.
pub fn derive_view<'a, T, Q>(items: &'a [T], query: &Q) -> Vec<&'a T>
where
    T: Searchable,
    Q: ViewQuery<T>,
{
    let mut view: Vec<&T> = search(items, query.text())
        .into_iter()
        .filter(|record| query.admits(record))
        .collect();
    view.sort_by(|a, b| query.compare(a, b));
    view
}

/// True when `tags` contains every tag in `selected`, compared
/// case-insensitively
pub fn has_all_tags(tags: &[String], selected: &[String]) -> bool {
    selected
        .iter()
        .all(|wanted| tags.iter().any(|tag| tag.eq_ignore_ascii_case(wanted.trim())))
}

/// Case-insensitive comparison, falling back to the raw strings so the
/// order is total
pub(crate) fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::{Searchable, ViewQuery, compare_text, derive_view};
use crate::models::Contact;

impl Searchable for Contact {
    fn any_search_field(&self, pred: &mut dyn FnMut(&str) -> bool) -> bool {
        if pred(self.name.as_str()) {
            return true;
        }
        [&self.phone, &self.email, &self.address, &self.company, &self.notes]
            .into_iter()
            .flatten()
            .any(|field| pred(field.as_str()))
    }
}

/// Contacts are always listed by name
#[derive(Debug, Clone, Default)]
pub struct ContactQuery {
    pub text: String,
    pub favorites_only: bool,
}

impl ContactQuery {
    pub fn matching(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn apply<'a>(&self, contacts: &'a [Contact]) -> Vec<&'a Contact> {
        derive_view(contacts, self)
    }

    /// Filtered view bucketed by uppercased initial
    pub fn grouped<'a>(&self, contacts: &'a [Contact]) -> BTreeMap<char, Vec<&'a Contact>> {
        group_by_initial(self.apply(contacts))
    }
}

impl ViewQuery<Contact> for ContactQuery {
    fn text(&self) -> &str {
        &self.text
    }

    fn admits(&self, contact: &Contact) -> bool {
        !self.favorites_only || contact.favorite
    }

    fn compare(&self, a: &Contact, b: &Contact) -> Ordering {
        compare_text(&a.name, &b.name)
    }
}

/// First character of `name`, uppercased. Multi-character uppercase
/// mappings keep only their first character.
pub fn initial_of(name: &str) -> Option<char> {
    name.chars().next().and_then(|c| c.to_uppercase().next())
}

/// Partition an already sorted view into buckets keyed by initial. Bucket
/// order is ascending by key, member order is preserved.
pub fn group_by_initial<'a, I>(contacts: I) -> BTreeMap<char, Vec<&'a Contact>>
where
    I: IntoIterator<Item = &'a Contact>,
{
    let mut groups: BTreeMap<char, Vec<&'a Contact>> = BTreeMap::new();
    for contact in contacts {
        // Names are validated non-empty on write
        let Some(initial) = initial_of(&contact.name) else {
            continue;
        };
        groups.entry(initial).or_default().push(contact);
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContactStats {
    pub total: usize,
    pub favorites: usize,
    pub with_company: usize,
    pub with_phone: usize,
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl ContactStats {
    pub fn compute(contacts: &[Contact]) -> Self {
        Self {
            total: contacts.len(),
            favorites: contacts.iter().filter(|c| c.favorite).count(),
            with_company: contacts.iter().filter(|c| filled(&c.company)).count(),
            with_phone: contacts.iter().filter(|c| filled(&c.phone)).count(),
        }
    }
}

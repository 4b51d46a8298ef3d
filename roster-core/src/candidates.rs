//! Candidate pool construction
//!
//! Every assignment path (create, single reassignment, deactivation cascade)
//! computes its pool the same way: active team members minus an
//! [`ExclusionSet`].

use std::collections::BTreeSet;

use crate::model::TeamMember;

/// Identifiers that must not be picked as reviewers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    ids: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one identifier
    pub fn insert(&mut self, id: impl Into<String>) -> &mut Self {
        self.ids.insert(id.into());
        self
    }

    /// Add every identifier from an iterator
    pub fn extend<I, T>(&mut self, ids: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<T: Into<String>> FromIterator<T> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Build the eligible candidate ids from a team's members.
///
/// Inactive members and excluded ids are dropped. The result is sorted and
/// free of duplicates so that selection with a seeded source is reproducible.
/// An empty result is not an error; callers decide whether it is fatal.
pub fn build_candidates(members: &[TeamMember], exclusions: &ExclusionSet) -> Vec<String> {
    members
        .iter()
        .filter(|m| m.is_active && !exclusions.contains(&m.user_id))
        .map(|m| m.user_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

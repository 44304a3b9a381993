//! SelectionState: the set of chosen station ids.

use std::collections::HashSet;

/// The only state that changes while curating.  A plain id set: it does
/// not know about the catalog, so ids seeded from a previous pass stay
/// selected even when the new fetch no longer contains them.  Membership
/// checks against the catalog happen in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    ids: HashSet<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with exactly `ids`.
    pub fn seed(&mut self, ids: impl IntoIterator<Item = String>) {
        self.ids = ids.into_iter().collect();
    }

    /// Flip membership of `id`.  Returns the new membership.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    /// Union `ids` into the selection.  Returns how many were newly added.
    pub fn select_many<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.ids.len();
        self.ids.extend(ids.into_iter().map(Into::into));
        self.ids.len() - before
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn size(&self) -> usize {
        self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

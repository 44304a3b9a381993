//! FilterSortEngine: derives the ordered view the curator sees.
//!
//! The whole catalog is filtered and sorted again on every call.  Catalogs
//! are a few hundred to a few thousand rows, and a full recompute cannot go
//! stale while the selection is being edited between frames.

use std::cmp::Ordering;

use crate::catalog::StationCatalog;
use crate::selection::SelectionState;
use crate::station::StationRecord;

/// Column the view is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Selected,
    Name,
    Tags,
    #[default]
    Clickcount,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Selected,
        SortKey::Name,
        SortKey::Tags,
        SortKey::Clickcount,
    ];

    /// Direction a key starts in when it becomes the active key.
    pub fn default_descending(self) -> bool {
        matches!(self, SortKey::Selected | SortKey::Clickcount)
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Selected => "selected",
            SortKey::Name => "name",
            SortKey::Tags => "tags",
            SortKey::Clickcount => "listeners",
        }
    }
}

/// Filter text plus sort column and direction.  Derived per session, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub filter_text: String,
    pub sort_key: SortKey,
    pub sort_descending: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            filter_text: String::new(),
            sort_key: SortKey::Clickcount,
            sort_descending: SortKey::Clickcount.default_descending(),
        }
    }
}

impl ViewState {
    /// Activate `key`.  Re-selecting the active key flips the direction;
    /// switching keys resets to that key's default direction.
    pub fn sort_by(&mut self, key: SortKey) {
        if self.sort_key == key {
            self.sort_descending = !self.sort_descending;
        } else {
            self.sort_key = key;
            self.sort_descending = key.default_descending();
        }
    }

    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.filter_text = text.into();
    }
}

/// Case-insensitive substring match on name or tags.  An empty filter
/// matches every record.
pub fn matches(record: &StationRecord, filter_lower: &str) -> bool {
    filter_lower.is_empty()
        || record.name.to_lowercase().contains(filter_lower)
        || record.tags.to_lowercase().contains(filter_lower)
}

/// Text ordering used for the name and tags columns: case-folded first,
/// then the raw string so differently-cased values still order
/// deterministically.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare(a: &StationRecord, b: &StationRecord, key: SortKey, selection: &SelectionState) -> Ordering {
    match key {
        SortKey::Selected => {
            let sa = selection.contains(&a.stationuuid);
            let sb = selection.contains(&b.stationuuid);
            sa.cmp(&sb)
        }
        SortKey::Name => compare_text(&a.name, &b.name),
        SortKey::Tags => compare_text(&a.tags, &b.tags),
        SortKey::Clickcount => a.clickcount.cmp(&b.clickcount),
    }
}

/// Rows of the catalog that pass the filter, ordered by the view's sort key.
///
/// The sort is stable, so rows with equal keys keep catalog order in both
/// directions.
pub fn view<'a>(
    catalog: &'a StationCatalog,
    state: &ViewState,
    selection: &SelectionState,
) -> Vec<&'a StationRecord> {
    let filter_lower = state.filter_text.to_lowercase();
    let mut rows: Vec<&StationRecord> = catalog
        .records()
        .iter()
        .filter(|r| matches(r, &filter_lower))
        .collect();

    let key = state.sort_key;
    if state.sort_descending {
        rows.sort_by(|a, b| compare(b, a, key, selection));
    } else {
        rows.sort_by(|a, b| compare(a, b, key, selection));
    }
    rows
}

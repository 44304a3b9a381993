//! CurationSession: one curation pass over a fetched catalog.
//!
//! Owns the catalog, the selection, the view settings and the preview player.
//! Every user intent goes through here so the catalog-membership rules live
//! in one place.

use std::path::Path;

use tracing::{debug, info};

use crate::catalog::StationCatalog;
use crate::error::{CurateError, Result};
use crate::export;
use crate::preview::{PreviewCommand, PreviewPlayer, StreamToken};
use crate::seed::PersistedSelectionSeed;
use crate::selection::SelectionState;
use crate::station::{CuratedRecord, StationRecord};
use crate::view::{self, SortKey, ViewState};

#[derive(Debug)]
pub struct CurationSession {
    catalog: StationCatalog,
    selection: SelectionState,
    view: ViewState,
    preview: PreviewPlayer,
}

impl CurationSession {
    /// Start a session.  The selection is exactly the seed's ids, including
    /// any the catalog no longer contains.
    pub fn new(catalog: StationCatalog, seed: PersistedSelectionSeed) -> Self {
        let mut selection = SelectionState::new();
        selection.seed(seed.into_ids());
        let session = Self {
            catalog,
            selection,
            view: ViewState::default(),
            preview: PreviewPlayer::new(),
        };
        info!(
            "session: {} station(s), {} preselected ({} not in catalog)",
            session.catalog.len(),
            session.selected_count(),
            session.seed_only_count()
        );
        session
    }

    pub fn catalog(&self) -> &StationCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn preview(&self) -> &PreviewPlayer {
        &self.preview
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Flip selection of a catalog record.  Returns the new membership.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        if !self.catalog.contains(id) {
            return Err(CurateError::UnknownStation(id.to_string()));
        }
        let selected = self.selection.toggle(id);
        debug!("session: {} {}", if selected { "select" } else { "deselect" }, id);
        Ok(selected)
    }

    /// Add every row of the current view to the selection.  Returns how many
    /// were newly selected.
    pub fn select_all_visible(&mut self) -> usize {
        let ids: Vec<String> = view::view(&self.catalog, &self.view, &self.selection)
            .into_iter()
            .map(|r| r.stationuuid.clone())
            .collect();
        let added = self.selection.select_many(ids);
        debug!("session: select all visible, {} added", added);
        added
    }

    /// Empty the selection, seed-only ids included.
    pub fn deselect_all(&mut self) {
        debug!("session: deselect all ({} dropped)", self.selection.size());
        self.selection.clear();
    }

    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.view.set_filter(text);
    }

    pub fn sort_by(&mut self, key: SortKey) {
        self.view.sort_by(key);
    }

    /// The rows to display, in display order.
    pub fn visible(&self) -> Vec<&StationRecord> {
        view::view(&self.catalog, &self.view, &self.selection)
    }

    /// Toggle preview of a catalog record.  Returns the backend commands to
    /// execute, in order.
    pub fn play(&mut self, id: &str) -> Result<Vec<PreviewCommand>> {
        let record = self
            .catalog
            .get(id)
            .ok_or_else(|| CurateError::UnknownStation(id.to_string()))?;
        Ok(self.preview.play(&record.stationuuid, &record.url_resolved))
    }

    /// Route a backend failure report.  `Some` when it concerned the live
    /// stream and the curator should be told.
    pub fn on_preview_failure(&mut self, token: StreamToken, reason: &str) -> Option<CurateError> {
        self.preview.on_failure(token, reason)
    }

    pub fn shutdown_preview(&mut self) -> Vec<PreviewCommand> {
        self.preview.shutdown()
    }

    pub fn export(&self) -> Vec<CuratedRecord> {
        export::export(&self.catalog, &self.selection)
    }

    /// Write the export to `path`.  Returns the number of stations written.
    pub fn export_to(&self, path: &Path) -> Result<usize> {
        let records = self.export();
        export::write_export(path, &records)?;
        Ok(records.len())
    }

    pub fn selected_count(&self) -> usize {
        self.selection.size()
    }

    /// Selected ids the catalog does not contain.  They stay selected but are
    /// never shown and never exported.
    pub fn seed_only_count(&self) -> usize {
        self.selection
            .iter()
            .filter(|id| !self.catalog.contains(id))
            .count()
    }
}

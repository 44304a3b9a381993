//! Action enum: every user intent the App applies to the session.

use curate_core::view::SortKey;

/// Components produce Actions; the App applies them to the session.
/// Record-level actions carry the `stationuuid` of the target row.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Selection ────────────────────────────────────────────────────────────
    Toggle(String),
    SelectAllVisible,
    DeselectAll,

    // ── Preview ──────────────────────────────────────────────────────────────
    Preview(String),

    // ── View ─────────────────────────────────────────────────────────────────
    SortBy(SortKey),
    OpenFilter,
    CloseFilter,
    FilterChanged(String),

    // ── Output ───────────────────────────────────────────────────────────────
    Export,

    // ── System ───────────────────────────────────────────────────────────────
    ToggleHelp,
    Quit,
}

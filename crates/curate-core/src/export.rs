//! Exporter: the curated subset in its canonical persisted shape.

use std::path::Path;

use tracing::info;

use crate::catalog::StationCatalog;
use crate::error::{CurateError, Result};
use crate::selection::SelectionState;
use crate::station::CuratedRecord;

/// Selected records in catalog order.  Independent of the current filter and
/// sort; seed-only ids that the catalog does not contain are not exported.
pub fn export(catalog: &StationCatalog, selection: &SelectionState) -> Vec<CuratedRecord> {
    catalog
        .records()
        .iter()
        .filter(|r| selection.contains(&r.stationuuid))
        .map(CuratedRecord::from)
        .collect()
}

/// Indented JSON array with a trailing newline, ready to diff.
pub fn to_json(records: &[CuratedRecord]) -> String {
    // Serializing plain strings and integers cannot fail.
    let mut out = serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());
    out.push('\n');
    out
}

/// Write `records` to `path`.  The data goes to a sibling temp file first
/// and is renamed into place, so a failed write leaves any previous file
/// intact.
pub fn write_export(path: &Path, records: &[CuratedRecord]) -> Result<()> {
    let io_err = |source| CurateError::ExportWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, to_json(records)).map_err(io_err)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(e));
    }

    info!("export: wrote {} station(s) to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::StationRecord;

    fn catalog() -> StationCatalog {
        StationCatalog::new(vec![
            StationRecord {
                stationuuid: "a".into(),
                name: "Drift FM".into(),
                url_resolved: "http://drift.example/stream".into(),
                tags: "ambient,chill".into(),
                clickcount: 120,
                bitrate: 128,
                ..Default::default()
            },
            StationRecord {
                stationuuid: "b".into(),
                name: "Space Noise".into(),
                clickcount: 50,
                ..Default::default()
            },
            StationRecord {
                stationuuid: "c".into(),
                name: "Unpicked".into(),
                ..Default::default()
            },
        ])
    }

    #[test]
    fn test_export_follows_catalog_order_not_selection_order() {
        let mut sel = SelectionState::new();
        sel.toggle("b");
        sel.toggle("a");
        sel.toggle("ghost");
        let out = export(&catalog(), &sel);
        let ids: Vec<&str> = out.iter().map(|r| r.stationuuid.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(out[1].tags, "");
        assert_eq!(out[1].bitrate, 0);
    }

    #[test]
    fn test_json_is_indented_and_drops_clickcount() {
        let mut sel = SelectionState::new();
        sel.toggle("a");
        let json = to_json(&export(&catalog(), &sel));
        assert!(json.starts_with("[\n  {\n    \"stationuuid\": \"a\""));
        assert!(json.ends_with("]\n"));
        assert!(!json.contains("clickcount"));
    }

    #[test]
    fn test_write_export_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ambient-stations.json");
        let mut sel = SelectionState::new();
        sel.toggle("b");
        write_export(&path, &export(&catalog(), &sel)).unwrap();

        let back: Vec<CuratedRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].name, "Space Noise");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_write_export_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should go makes the rename fail.
        let path = dir.path().join("taken");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();
        let err = write_export(&path, &[]).unwrap_err();
        assert!(matches!(err, CurateError::ExportWrite { .. }));
    }
}

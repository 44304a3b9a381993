//! PersistedSelectionSeed: ids from the previously curated file.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{CurateError, Result};

/// Read-once set of previously curated ids.  Not validated against the new
/// catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSelectionSeed {
    ids: HashSet<String>,
}

impl PersistedSelectionSeed {
    /// Load ids from a curated JSON file.
    ///
    /// A missing file is an empty seed.  A file that is unreadable or not a
    /// JSON array is `MalformedSeed`.  Array entries without a string
    /// `stationuuid` are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("seed: {} not found, starting with empty selection", path.display());
            return Ok(Self::default());
        }

        let malformed = |reason: String| CurateError::MalformedSeed {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
        let seed = Self::parse(&content).map_err(malformed)?;
        info!("seed: {} curated station(s) from {}", seed.len(), path.display());
        Ok(seed)
    }

    /// Like [`load`](Self::load) but never fails: a malformed file yields an
    /// empty seed plus the error so the caller can tell the curator.
    pub fn load_or_empty(path: &Path) -> (Self, Option<CurateError>) {
        match Self::load(path) {
            Ok(seed) => (seed, None),
            Err(e) => {
                warn!("seed: {}", e);
                (Self::default(), Some(e))
            }
        }
    }

    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let entries = value
            .as_array()
            .ok_or_else(|| "expected a JSON array of stations".to_string())?;

        let mut ids = HashSet::with_capacity(entries.len());
        let mut skipped = 0usize;
        for entry in entries {
            match entry.get("stationuuid").and_then(Value::as_str) {
                Some(id) if !id.trim().is_empty() => {
                    ids.insert(id.trim().to_string());
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("seed: skipped {} entr(ies) without stationuuid", skipped);
        }
        Ok(Self { ids })
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    pub fn into_ids(self) -> HashSet<String> {
        self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_seed() {
        let dir = tempfile::tempdir().unwrap();
        let seed = PersistedSelectionSeed::load(&dir.path().join("nope.json")).unwrap();
        assert!(seed.is_empty());
    }

    #[test]
    fn test_reads_ids_from_curated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ambient-stations.json");
        std::fs::write(
            &path,
            r#"[{"stationuuid":"b","name":"Space Noise"},{"name":"no id"},{"stationuuid":"x"}]"#,
        )
        .unwrap();
        let seed = PersistedSelectionSeed::load(&path).unwrap();
        assert_eq!(seed.len(), 2);
        assert!(seed.ids().contains("b"));
        assert!(seed.ids().contains("x"));
    }

    #[test]
    fn test_malformed_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[{\"stationuuid\": ").unwrap();
        let (seed, err) = PersistedSelectionSeed::load_or_empty(&path);
        assert!(seed.is_empty());
        assert!(matches!(err, Some(CurateError::MalformedSeed { .. })));

        std::fs::write(&path, r#"{"stationuuid":"a"}"#).unwrap();
        assert!(PersistedSelectionSeed::load(&path).is_err());
    }
}

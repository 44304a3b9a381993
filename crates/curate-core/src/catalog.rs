//! StationCatalog: the fixed, deduplicated candidate set for one session.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::station::{RawStation, StationRecord};

/// Ordered, immutable list of candidates.  Built once per session; there is
/// no API to mutate it afterwards.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    records: Vec<StationRecord>,
    /// stationuuid → position in `records`.
    index: HashMap<String, usize>,
}

impl StationCatalog {
    /// Build a catalog from already-normalized records.
    ///
    /// Duplicate ids: the first occurrence wins and later repeats are
    /// dropped.  Directory results come popularity-ordered, so the first
    /// copy is the one the curator would see at the top anyway.
    pub fn new(records: impl IntoIterator<Item = StationRecord>) -> Self {
        let mut kept = Vec::new();
        let mut index = HashMap::new();
        let mut duplicates = 0usize;

        for rec in records {
            if index.contains_key(&rec.stationuuid) {
                duplicates += 1;
                debug!("catalog: dropping duplicate station {}", rec.stationuuid);
                continue;
            }
            index.insert(rec.stationuuid.clone(), kept.len());
            kept.push(rec);
        }

        if duplicates > 0 {
            warn!("catalog: dropped {} duplicate station id(s)", duplicates);
        }

        Self {
            records: kept,
            index,
        }
    }

    /// Normalize raw directory records and build the catalog.  Records
    /// without an id are skipped.
    pub fn from_raw(raw: impl IntoIterator<Item = RawStation>) -> Self {
        let mut missing_id = 0usize;
        let records: Vec<StationRecord> = raw
            .into_iter()
            .filter_map(|r| {
                let rec = StationRecord::from_raw(r);
                if rec.is_none() {
                    missing_id += 1;
                }
                rec
            })
            .collect();
        if missing_id > 0 {
            warn!("catalog: skipped {} record(s) without stationuuid", missing_id);
        }
        Self::new(records)
    }

    pub fn records(&self) -> &[StationRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&StationRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

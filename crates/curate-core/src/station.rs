//! Station record shapes: the loose record coming off the directory API, the
//! fixed-shape record used inside a session, and the minimal curated record
//! that is persisted.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One candidate as returned by the directory, before normalization.
///
/// The API is loose about types: fields go missing, arrive as `null`, or
/// carry numbers as strings.  Every field is therefore tolerant and falls
/// back to the empty value instead of failing the whole payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub stationuuid: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url_resolved: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tags: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub homepage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub favicon: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub countrycode: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub codec: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bitrate: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub clickcount: u64,
}

/// A normalized candidate.  Identity is `stationuuid`; every other field is
/// always present and holds the empty value when the source had nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StationRecord {
    pub stationuuid: String,
    pub name: String,
    pub url_resolved: String,
    pub tags: String,
    pub homepage: String,
    pub favicon: String,
    pub country: String,
    pub countrycode: String,
    pub codec: String,
    pub bitrate: u64,
    pub clickcount: u64,
}

impl StationRecord {
    /// Normalize a raw record.  Returns `None` when the record has no id.
    pub fn from_raw(raw: RawStation) -> Option<Self> {
        let id = raw.stationuuid.trim();
        if id.is_empty() {
            return None;
        }
        Some(Self {
            stationuuid: id.to_string(),
            name: raw.name,
            url_resolved: raw.url_resolved,
            tags: raw.tags,
            homepage: raw.homepage,
            favicon: raw.favicon,
            country: raw.country,
            countrycode: raw.countrycode,
            codec: raw.codec,
            bitrate: raw.bitrate,
            clickcount: raw.clickcount,
        })
    }
}

/// The canonical persisted shape.  Field order here is the field order in
/// the written file.  `clickcount` is deliberately not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedRecord {
    pub stationuuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url_resolved: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub favicon: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub countrycode: String,
    #[serde(default)]
    pub codec: String,
    #[serde(default)]
    pub bitrate: u64,
}

impl From<&StationRecord> for CuratedRecord {
    fn from(s: &StationRecord) -> Self {
        Self {
            stationuuid: s.stationuuid.clone(),
            name: s.name.clone(),
            url_resolved: s.url_resolved.clone(),
            tags: s.tags.clone(),
            homepage: s.homepage.clone(),
            favicon: s.favicon.clone(),
            country: s.country.clone(),
            countrycode: s.countrycode.clone(),
            codec: s.codec.clone(),
            bitrate: s.bitrate,
        }
    }
}

fn lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_u64<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_tolerates_missing_and_null_fields() {
        let raw: RawStation = serde_json::from_str(
            r#"{"stationuuid":"a","name":null,"bitrate":"128","clickcount":-4}"#,
        )
        .unwrap();
        let rec = StationRecord::from_raw(raw).unwrap();
        assert_eq!(rec.stationuuid, "a");
        assert_eq!(rec.name, "");
        assert_eq!(rec.tags, "");
        assert_eq!(rec.bitrate, 128);
        assert_eq!(rec.clickcount, 0);
    }

    #[test]
    fn test_record_without_id_is_dropped() {
        let raw: RawStation = serde_json::from_str(r#"{"name":"No Id FM"}"#).unwrap();
        assert!(StationRecord::from_raw(raw).is_none());

        let raw: RawStation = serde_json::from_str(r#"{"stationuuid":"  "}"#).unwrap();
        assert!(StationRecord::from_raw(raw).is_none());
    }

    #[test]
    fn test_curated_shape_has_no_clickcount() {
        let rec = StationRecord {
            stationuuid: "a".into(),
            name: "Drift FM".into(),
            clickcount: 120,
            ..Default::default()
        };
        let json = serde_json::to_value(CuratedRecord::from(&rec)).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("clickcount"));
        assert_eq!(obj.len(), 10);
        assert_eq!(obj["tags"], "");
        assert_eq!(obj["bitrate"], 0);
    }
}

//! Mapping of remote listing entries onto [`ScienceFileRecord`]s.
//!
//! The query endpoint returns JSON objects that carry at least a `file_path`.
//! The filename is re-parsed with the local grammar, so a query result and a
//! file parsed from disk are the same type. Entries that do not parse are kept
//! as per-entry errors instead of being dropped.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::naming::{ScienceFilePath, ScienceFileRecord, ValidationErrors};

/// One object from the query endpoint's JSON array.
pub type RawListingEntry = Map<String, Value>;

/// Keys whose values are recovered from the filename itself.
const FILENAME_KEYS: &[&str] = &[
    "instrument",
    "data_level",
    "descriptor",
    "start_date",
    "end_date",
    "repointing",
    "version",
    "extension",
];

const FILE_PATH_KEY: &str = "file_path";
const INGESTION_DATE_KEY: &str = "ingestion_date";

const INGESTION_DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y%m%d %H:%M:%S"];

/// A listing entry reconstructed from its filename, plus remote-only metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRecord {
    #[serde(flatten)]
    pub record: ScienceFileRecord,
    /// Canonical archive path derived from the filename.
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingestion_date: Option<String>,
    /// Any other keys the service sent, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryRecord {
    pub fn filename(&self) -> String {
        self.record.filename()
    }

    /// The ingestion timestamp, when the service sent one in a known format.
    pub fn ingested_at(&self) -> Option<NaiveDateTime> {
        let raw = self.ingestion_date.as_deref()?;
        INGESTION_DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("entry {index}: not a JSON object")]
    NotAnObject { index: usize },

    #[error("entry {index}: missing 'file_path'")]
    MissingFilePath { index: usize },

    #[error("entry {index}: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: ValidationErrors,
    },

    #[error("entry {index}: listed at '{listed}' but the filename belongs at '{expected}'")]
    PathMismatch {
        index: usize,
        listed: String,
        expected: String,
    },
}

impl MappingError {
    /// Position of the offending entry in the listing.
    pub fn index(&self) -> usize {
        match self {
            Self::NotAnObject { index }
            | Self::MissingFilePath { index }
            | Self::Malformed { index, .. }
            | Self::PathMismatch { index, .. } => *index,
        }
    }
}

/// Result of mapping a whole listing: good records and per-entry failures.
#[derive(Debug, Default)]
pub struct MappedListing {
    pub records: Vec<QueryRecord>,
    pub errors: Vec<MappingError>,
}

impl MappedListing {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Keep only the newest version of each product.
    pub fn latest_only(self) -> Self {
        Self {
            records: select_latest(self.records),
            errors: self.errors,
        }
    }
}

/// Map one listing entry.
pub fn map_entry(index: usize, entry: &RawListingEntry) -> Result<QueryRecord, MappingError> {
    let listed = entry
        .get(FILE_PATH_KEY)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(MappingError::MissingFilePath { index })?;

    let record = ScienceFilePath::parse(listed)
        .map_err(|source| MappingError::Malformed { index, source })?;

    let expected = record.archive_path();
    let listed_trimmed = listed.trim_start_matches('/');
    if listed_trimmed.contains('/') && listed_trimmed != expected {
        return Err(MappingError::PathMismatch {
            index,
            listed: listed.to_string(),
            expected,
        });
    }

    let ingestion_date = entry.get(INGESTION_DATE_KEY).and_then(|v| match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    });
    let extra = entry
        .iter()
        .filter(|(key, _)| {
            let key = key.as_str();
            key != FILE_PATH_KEY && key != INGESTION_DATE_KEY && !FILENAME_KEYS.contains(&key)
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(QueryRecord {
        record,
        file_path: expected,
        ingestion_date,
        extra,
    })
}

/// Map every entry of a listing, collecting failures per entry.
pub fn map_listing(entries: &[Value]) -> MappedListing {
    let mut mapped = MappedListing::default();
    for (index, entry) in entries.iter().enumerate() {
        let result = match entry.as_object() {
            Some(object) => map_entry(index, object),
            None => Err(MappingError::NotAnObject { index }),
        };
        match result {
            Ok(record) => mapped.records.push(record),
            Err(e) => {
                tracing::warn!("Skipping listing entry: {}", e);
                mapped.errors.push(e);
            }
        }
    }
    tracing::debug!(
        "Mapped {} listing entries ({} rejected)",
        mapped.records.len(),
        mapped.errors.len()
    );
    mapped
}

/// Reduce records to the highest version of each product, keeping first-seen order.
pub fn select_latest(records: Vec<QueryRecord>) -> Vec<QueryRecord> {
    let mut slots: HashMap<_, usize> = HashMap::new();
    let mut latest: Vec<QueryRecord> = Vec::new();
    for record in records {
        let key = record.record.product_key();
        match slots.get(&key) {
            Some(&i) => {
                if record.record.version() > latest[i].record.version() {
                    latest[i] = record;
                }
            }
            None => {
                slots.insert(key, latest.len());
                latest.push(record);
            }
        }
    }
    latest
}

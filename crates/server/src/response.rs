//! Client-facing lookup result.

use namewatch_core::{CacheEntry, ResolvedRecord};
use serde::{Deserialize, Serialize};

/// Body of a successful `GET /api/search/{name}`.
///
/// `droptime` is omitted, not null, when the name has no availability instant;
/// clients key off the field's presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub searches: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub droptime: Option<i64>,
}

impl LookupResult {
    pub fn shape(name: &str, record: &ResolvedRecord) -> Self {
        Self {
            searches: record.search_count.clone(),
            name: name.to_string(),
            droptime: record.availability_time.map(|t| t.timestamp()),
        }
    }

    pub fn from_entry(entry: &CacheEntry) -> Self {
        Self::shape(&entry.name, &entry.record())
    }
}

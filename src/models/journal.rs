use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENTRY_TYPE: &str = "personal";

/// A free-text journal entry.
///
/// Entries are grouped by `entry_type` (e.g. `personal`, `gratitude`), which
/// is free text rather than a fixed enum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: String,
    pub entry_type: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for saving a journal entry.
///
/// With an `id` that already exists, the entry is overwritten in place and keeps
/// its creation time. Without one, a new id is generated from the current
/// millisecond timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveJournalEntryInput {
    pub id: Option<String>,
    pub entry_type: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// Filters for listing journal entries.
///
/// An `entry_type` of `all` or blank matches every type. `q` is a
/// case-insensitive substring of the content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalFilter {
    #[serde(rename = "type", default)]
    pub entry_type: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

impl JournalFilter {
    pub fn entry_type(&self) -> Option<&str> {
        self.entry_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("all"))
    }

    /// The lowercased search term, if any.
    pub fn query(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

/// A completed self-analysis form about one journal entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisEntry {
    pub id: String,
    pub title: String,
    /// The analysed journal entry. `None` only for analyses saved before
    /// entries were linked.
    pub entry_id: Option<String>,
    /// Question -> answer, free text.
    pub answers: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnalysisInput {
    pub title: String,
    /// Must name an existing journal entry.
    #[serde(default)]
    pub entry_id: String,
    /// At least one answer must be non-blank.
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

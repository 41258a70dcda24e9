//! Transient per-project metadata

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the creation timestamp
pub const CREATION_DATE: &str = "creationDate";
/// Key of the last-update timestamp
pub const MODIFICATION_DATE: &str = "modificationDate";

/// Key/value bag stored next to a project's config
///
/// Not part of the declared config: handlers and tooling put bookkeeping
/// here (timestamps, sync flags) without changing the project type contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectMisc {
    entries: BTreeMap<String, String>,
}

impl ProjectMisc {
    /// Empty bag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bag from raw entries
    #[inline]
    #[must_use]
    pub fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set a value, returning the previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if bag is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When the project was created
    #[must_use]
    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.timestamp(CREATION_DATE)
    }

    /// When the project config was last written
    #[must_use]
    pub fn modification_date(&self) -> Option<DateTime<Utc>> {
        self.timestamp(MODIFICATION_DATE)
    }

    /// Stamp creation and modification with `now`
    pub fn mark_created(&mut self, now: DateTime<Utc>) {
        let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.set(CREATION_DATE, stamp.clone());
        self.set(MODIFICATION_DATE, stamp);
    }

    /// Stamp modification with `now`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.set(
            MODIFICATION_DATE,
            now.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

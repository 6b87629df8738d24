//! Typed enrichment cache
//!
//! AI-derived artifacts cached per lead. Each kind of artifact has its
//! own key and TTL; an expired entry is treated as absent so callers
//! regenerate instead of serving stale research.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kinds of cached enrichment artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentKey {
    /// One-paragraph explanation of why the lead fits
    WhyThisLead,
    /// Structured company research
    CompanyResearch,
    /// Suggested contacts to reach out to
    ContactFinder,
}

impl EnrichmentKey {
    /// How long an entry of this kind stays fresh.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        match self {
            EnrichmentKey::WhyThisLead => Duration::days(7),
            EnrichmentKey::CompanyResearch => Duration::days(30),
            EnrichmentKey::ContactFinder => Duration::days(14),
        }
    }
}

/// One cached artifact with its generation timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentEntry {
    /// The artifact payload
    pub payload: serde_json::Value,
    /// When the artifact was generated
    pub generated_at: DateTime<Utc>,
}

impl EnrichmentEntry {
    /// Whether the entry is still fresh for `key` at `now`.
    #[inline]
    #[must_use]
    pub fn is_fresh(&self, key: EnrichmentKey, now: DateTime<Utc>) -> bool {
        now - self.generated_at < key.ttl()
    }
}

/// Per-lead cache of enrichment artifacts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentCache {
    entries: HashMap<EnrichmentKey, EnrichmentEntry>,
}

impl EnrichmentCache {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an artifact generated at `now`, replacing any prior entry.
    pub fn insert(&mut self, key: EnrichmentKey, payload: serde_json::Value, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            EnrichmentEntry {
                payload,
                generated_at: now,
            },
        );
    }

    /// Fetch the artifact for `key` if present and within its TTL.
    #[must_use]
    pub fn fresh(&self, key: EnrichmentKey, now: DateTime<Utc>) -> Option<&serde_json::Value> {
        self.entries
            .get(&key)
            .filter(|entry| entry.is_fresh(key, now))
            .map(|entry| &entry.payload)
    }

    /// Fetch the artifact for `key` regardless of freshness.
    #[must_use]
    pub fn raw(&self, key: EnrichmentKey) -> Option<&EnrichmentEntry> {
        self.entries.get(&key)
    }

    /// Number of cached artifacts, fresh or not.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no artifacts.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

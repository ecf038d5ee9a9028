use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RecallError, Result};
use crate::storage::entry::StoredEntry;

pub type EntryMap = BTreeMap<String, StoredEntry>;

/// Key-value contract of the persistence backend.
pub trait FormStore {
    fn save(&mut self, key: &str, entry: &StoredEntry) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<StoredEntry>>;
    fn get_all(&self) -> Result<EntryMap>;
    fn delete(&mut self, key: &str) -> Result<()>;
    fn clear(&mut self, keys: &[String]) -> Result<()>;
}

pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;
pub const EVICTION_THRESHOLD: f64 = 0.9;
pub const EVICTION_FRACTION: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    #[serde(default = "default_quota")]
    pub quota_bytes: usize,
    /// Utilization above which the oldest entries are evicted before a write.
    #[serde(default = "default_threshold")]
    pub eviction_threshold: f64,
    /// Share of entries evicted, oldest `savedAt` first.
    #[serde(default = "default_fraction")]
    pub eviction_fraction: f64,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            quota_bytes: DEFAULT_QUOTA_BYTES,
            eviction_threshold: EVICTION_THRESHOLD,
            eviction_fraction: EVICTION_FRACTION,
        }
    }
}

fn default_quota() -> usize { DEFAULT_QUOTA_BYTES }
fn default_threshold() -> f64 { EVICTION_THRESHOLD }
fn default_fraction() -> f64 { EVICTION_FRACTION }

impl QuotaPolicy {
    pub fn unlimited() -> Self {
        Self {
            quota_bytes: usize::MAX,
            ..Self::default()
        }
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes,
            ..Self::default()
        }
    }

    fn over_threshold(&self, used: usize) -> bool {
        used as f64 > self.quota_bytes as f64 * self.eviction_threshold
    }

    fn eviction_count(&self, entries: usize) -> usize {
        if entries == 0 {
            return 0;
        }
        ((entries as f64 * self.eviction_fraction).floor() as usize).max(1)
    }
}

/// Quota-limited in-memory tier.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: EntryMap,
    policy: QuotaPolicy,
}

impl MemoryStore {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            entries: EntryMap::new(),
            policy,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(QuotaPolicy::unlimited())
    }

    pub fn from_entries(entries: EntryMap, policy: QuotaPolicy) -> Self {
        Self { entries, policy }
    }

    pub fn entries(&self) -> &EntryMap {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes in use, excluding `skip` (the entry about to be replaced).
    pub fn used_bytes(&self, skip: Option<&str>) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| Some(k.as_str()) != skip)
            .map(|(k, e)| e.footprint(k))
            .sum()
    }

    /// Drop the oldest share of entries; returns the evicted keys.
    pub fn evict_oldest(&mut self) -> Vec<String> {
        let mut by_age: Vec<(&String, i64)> =
            self.entries.iter().map(|(k, e)| (k, e.saved_at)).collect();
        by_age.sort_by_key(|(_, saved_at)| *saved_at);

        let count = self.policy.eviction_count(by_age.len());
        let evicted: Vec<String> = by_age
            .into_iter()
            .take(count)
            .map(|(k, _)| k.clone())
            .collect();

        for key in &evicted {
            self.entries.remove(key);
        }
        evicted
    }
}

impl FormStore for MemoryStore {
    fn save(&mut self, key: &str, entry: &StoredEntry) -> Result<()> {
        let needed = entry.footprint(key);
        let mut used = self.used_bytes(Some(key));

        if self.policy.over_threshold(used + needed) {
            let evicted = self.evict_oldest();
            info!(count = evicted.len(), "evicted oldest entries before write");
            used = self.used_bytes(Some(key));
        }

        let available = self.policy.quota_bytes.saturating_sub(used);
        if needed > available {
            return Err(RecallError::QuotaExceeded { needed, available });
        }

        debug!(key, bytes = needed, "entry written");
        self.entries.insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        Ok(self.entries.get(key).cloned())
    }

    fn get_all(&self) -> Result<EntryMap> {
        Ok(self.entries.clone())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }
}

impl<S: FormStore + ?Sized> FormStore for Box<S> {
    fn save(&mut self, key: &str, entry: &StoredEntry) -> Result<()> {
        (**self).save(key, entry)
    }

    fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        (**self).get(key)
    }

    fn get_all(&self) -> Result<EntryMap> {
        (**self).get_all()
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn clear(&mut self, keys: &[String]) -> Result<()> {
        (**self).clear(keys)
    }
}

use tracing::warn;

use crate::error::{RecallError, Result};
use crate::storage::entry::StoredEntry;
use crate::storage::store::{EntryMap, FormStore};

/// Primary quota-limited tier with a fallback used when primary writes fail.
pub struct TieredStore<P: FormStore, F: FormStore> {
    pub primary: P,
    pub fallback: F,
}

impl<P: FormStore, F: FormStore> TieredStore<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: FormStore, F: FormStore> FormStore for TieredStore<P, F> {
    fn save(&mut self, key: &str, entry: &StoredEntry) -> Result<()> {
        let primary_err = match self.primary.save(key, entry) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        warn!(key, error = %primary_err, "primary write failed, using fallback tier");
        self.fallback
            .save(key, entry)
            .map_err(|fallback_err| RecallError::WriteFailed {
                key: key.to_string(),
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            })?;

        // reads go primary-first; an older primary copy would shadow this write
        if let Err(e) = self.primary.delete(key) {
            warn!(key, error = %e, "could not drop superseded primary entry");
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        match self.primary.get(key) {
            Ok(Some(entry)) => return Ok(Some(entry)),
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "primary read failed"),
        }
        self.fallback.get(key)
    }

    /// Fallback entries first, primary entries win on conflict.
    fn get_all(&self) -> Result<EntryMap> {
        let mut all = match self.fallback.get_all() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "fallback listing failed");
                EntryMap::new()
            }
        };
        all.extend(self.primary.get_all()?);
        Ok(all)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let primary = self.primary.delete(key);
        let fallback = self.fallback.delete(key);
        primary.and(fallback)
    }

    fn clear(&mut self, keys: &[String]) -> Result<()> {
        let primary = self.primary.clear(keys);
        let fallback = self.fallback.clear(keys);
        primary.and(fallback)
    }
}

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RecallError, Result};
use crate::storage::entry::StoredEntry;
use crate::storage::store::{EntryMap, FormStore, MemoryStore, QuotaPolicy};

/// A [`MemoryStore`] mirrored to a JSON file after every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>, policy: QuotaPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries: EntryMap = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => EntryMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| RecallError::json(format!("reading {}", path.display()), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => EntryMap::new(),
            Err(e) => return Err(RecallError::io(format!("reading {}", path.display()), e)),
        };

        debug!(path = %path.display(), entries = entries.len(), "file store opened");
        Ok(Self {
            path,
            inner: MemoryStore::from_entries(entries, policy),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy, write the copy out, and only then adopt it.
    /// A failed write leaves both memory and disk at the previous state.
    fn commit(&mut self, mutate: impl FnOnce(&mut MemoryStore) -> Result<()>) -> Result<()> {
        let mut staged = self.inner.clone();
        mutate(&mut staged)?;
        write_entries(&self.path, staged.entries())?;
        self.inner = staged;
        Ok(())
    }
}

fn write_entries(path: &Path, entries: &EntryMap) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| RecallError::json("serializing store", e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| RecallError::io(format!("creating {}", parent.display()), e))?;
    }

    std::fs::write(path, json).map_err(|e| RecallError::io(format!("writing {}", path.display()), e))
}

impl FormStore for JsonFileStore {
    fn save(&mut self, key: &str, entry: &StoredEntry) -> Result<()> {
        self.commit(|store| store.save(key, entry))
    }

    fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        self.inner.get(key)
    }

    fn get_all(&self) -> Result<EntryMap> {
        self.inner.get_all()
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        if !self.inner.entries().contains_key(key) {
            return Ok(());
        }
        self.commit(|store| store.delete(key))
    }

    fn clear(&mut self, keys: &[String]) -> Result<()> {
        if !keys.iter().any(|k| self.inner.entries().contains_key(k)) {
            return Ok(());
        }
        self.commit(|store| store.clear(keys))
    }
}

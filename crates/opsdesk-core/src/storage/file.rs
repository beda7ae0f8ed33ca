//! JSON file storage backend.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use super::{KeyValueStore, StorageError, StorageResult};

/// Store persisted as a single JSON object on disk.
///
/// The document is read once on open and rewritten (temp file + rename) on
/// every mutation, so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens (or lazily creates) the store at `path`.
    ///
    /// A corrupt document is logged and replaced by an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("Discarding corrupt storage file {}: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Opened storage {} with {} keys", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Opens the store in the platform data directory.
    ///
    /// # Errors
    ///
    /// See [`FileStore::open`].
    pub fn open_default() -> StorageResult<Self> {
        Self::open(Self::default_path())
    }

    /// `<data dir>/opsdesk/storage.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("opsdesk")
            .join("storage.json")
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries.lock().map_err(|_| StorageError::Poisoned)
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.lock()?;
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&entries) {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.lock()?;
        if let Some(old) = entries.remove(key) {
            if let Err(e) = self.flush(&entries) {
                entries.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }

    fn set_many(&self, batch: &[(String, String)]) -> StorageResult<()> {
        let mut entries = self.lock()?;
        let mut previous = Vec::with_capacity(batch.len());
        for (key, value) in batch {
            previous.push((key, entries.insert(key.clone(), value.clone())));
        }
        if let Err(e) = self.flush(&entries) {
            // Undo in reverse so a key repeated in the batch gets its
            // original value back.
            for (key, old) in previous.into_iter().rev() {
                match old {
                    Some(old) => entries.insert(key.clone(), old),
                    None => entries.remove(key),
                };
            }
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn remove_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let mut entries = self.lock()?;
        let doomed: Vec<String> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }
        let removed: Vec<(String, String)> = doomed
            .into_iter()
            .filter_map(|key| entries.remove(&key).map(|value| (key, value)))
            .collect();
        if let Err(e) = self.flush(&entries) {
            entries.extend(removed);
            return Err(e);
        }
        Ok(removed.len())
    }
}

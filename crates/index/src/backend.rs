use crate::IndexError;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Key/value storage under the embedded document store.
///
/// Keys are document ids; values are encoded [`crate::StoredDocument`]
/// records. Implementations must be safe to share across threads.
pub trait IndexBackend: Send + Sync {
    /// Insert or overwrite a value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError>;
    /// Fetch a value by key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError>;
    /// Remove a key. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), IndexError>;
    /// Insert or overwrite several values in one write.
    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError>;
    /// Visit every stored value.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError>;
    /// Number of stored values.
    fn len(&self) -> Result<usize, IndexError> {
        let mut n = 0usize;
        self.scan(&mut |_| {
            n += 1;
            Ok(())
        })?;
        Ok(n)
    }
    /// Flush buffered writes.
    fn flush(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Ephemeral backend over a `RwLock<BTreeMap>`; scans run in key order.
#[derive(Default)]
pub struct InMemoryBackend {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> IndexError {
    IndexError::backend("poisoned lock")
}

impl IndexBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.records
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        Ok(self.records.read().map_err(poisoned)?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.records.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        // One write lock for the whole batch.
        let mut guard = self.records.write().map_err(poisoned)?;
        guard.extend(entries);
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let guard = self.records.read().map_err(poisoned)?;
        for value in guard.values() {
            visitor(value)?;
        }
        Ok(())
    }

    fn len(&self) -> Result<usize, IndexError> {
        Ok(self.records.read().map_err(poisoned)?.len())
    }
}

/// Persistent backend on a single redb file.
#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use redb::RedbBackend;

//! redb backend for the embedded document store.
//!
//! One table maps document id to the encoded record. Every write is its own
//! committed transaction, so a crash mid-ingest loses at most the document
//! being written.
//!
//! ```yaml
//! store:
//!   backend: redb
//!   path: /data/cbir.redb
//! ```

use crate::{IndexBackend, IndexError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("cbir_documents");

fn backend_err<E: std::fmt::Display>(err: E) -> IndexError {
    IndexError::backend(err)
}

/// redb-backed [`IndexBackend`].
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create the database file and make sure the table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let db = Database::create(path).map_err(backend_err)?;
        let txn = db.begin_write().map_err(backend_err)?;
        {
            let _table = txn.open_table(DOCUMENTS).map_err(backend_err)?;
        }
        txn.commit().map_err(backend_err)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn write<F>(&self, f: F) -> Result<(), IndexError>
    where
        F: FnOnce(&mut redb::Table<'_, &'static str, &'static [u8]>) -> Result<(), IndexError>,
    {
        let txn = self.db.begin_write().map_err(backend_err)?;
        {
            let mut table = txn.open_table(DOCUMENTS).map_err(backend_err)?;
            f(&mut table)?;
        }
        txn.commit().map_err(backend_err)
    }
}

impl IndexBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.write(|table| {
            table.insert(key, value).map_err(backend_err)?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let table = txn.open_table(DOCUMENTS).map_err(backend_err)?;
        let value = table.get(key).map_err(backend_err)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.write(|table| {
            table.remove(key).map_err(backend_err)?;
            Ok(())
        })
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        self.write(|table| {
            for (key, value) in &entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(backend_err)?;
            }
            Ok(())
        })
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let table = txn.open_table(DOCUMENTS).map_err(backend_err)?;
        for item in table.iter().map_err(backend_err)? {
            let (_, value) = item.map_err(backend_err)?;
            visitor(value.value())?;
        }
        Ok(())
    }
}

//! # redb-backed Document Store
//!
//! A disk-backed `DocumentStore` using the redb embedded database.
//!
//! - ACID transactions (one write transaction per call)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! JSON documents are stored as their serialized bytes. Index definitions
//! are code, so they live in memory and are registered again on every open;
//! snapshots are rebuilt from the documents table on demand.

use super::{Consistency, Document, DocumentStore, IndexCatalog, IndexDefinition, IndexRow, KeyRange};
use crate::types::StoreError;
use parking_lot::Mutex;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::fmt::Display;
use std::path::{Path, PathBuf};

type BytesTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Table for JSON documents: key -> serialized JSON bytes
const DOCUMENTS: BytesTable = TableDefinition::new("documents");

/// Table for binary documents: key -> raw bytes
const BINARIES: BytesTable = TableDefinition::new("binaries");

/// Table for counters: key -> value
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

fn backend<E: Display>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn encode(doc: &Document) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(doc).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Document, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Document store persisted in a single redb file.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
    indexes: Mutex<IndexCatalog>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(backend)?;

        // Initialize tables so read transactions can always open them
        {
            let write_txn = db.begin_write().map_err(backend)?;
            let _ = write_txn.open_table(DOCUMENTS).map_err(backend)?;
            let _ = write_txn.open_table(BINARIES).map_err(backend)?;
            let _ = write_txn.open_table(COUNTERS).map_err(backend)?;
            write_txn.commit().map_err(backend)?;
        }

        Ok(Self {
            db,
            path,
            indexes: Mutex::new(IndexCatalog::new()),
        })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<bool, StoreError> {
        self.db.compact().map_err(backend)
    }

    fn scan_documents(&self) -> Result<Vec<(String, Document)>, StoreError> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(DOCUMENTS).map_err(backend)?;
        let mut documents = Vec::new();
        for entry in table.iter().map_err(backend)? {
            let (key, value) = entry.map_err(backend)?;
            documents.push((key.value().to_string(), decode(value.value())?));
        }
        Ok(documents)
    }

    fn read_bytes(
        &self,
        definition: BytesTable,
        key: &str,
    ) -> Result<Vec<u8>, StoreError> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(definition).map_err(backend)?;
        table
            .get(key)
            .map_err(backend)?
            .map(|v| v.value().to_vec())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn delete(&self, definition: BytesTable, key: &str) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(backend)?;
        let existed = {
            let mut table = write_txn.open_table(definition).map_err(backend)?;
            table.remove(key).map_err(backend)?.is_some()
        };
        if !existed {
            return Err(StoreError::NotFound(key.to_string()));
        }
        write_txn.commit().map_err(backend)
    }

    fn write_document(&self, key: &str, doc: &Document, must_exist: bool) -> Result<(), StoreError> {
        let bytes = encode(doc)?;
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(DOCUMENTS).map_err(backend)?;
            let exists = table.get(key).map_err(backend)?.is_some();
            match (must_exist, exists) {
                (true, false) => return Err(StoreError::NotFound(key.to_string())),
                (false, true) => return Err(StoreError::AlreadyExists(key.to_string())),
                _ => {}
            }
            table.insert(key, bytes.as_slice()).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)
    }
}

impl DocumentStore for RedbStore {
    fn name(&self) -> &'static str {
        "redb"
    }

    fn get(&self, key: &str) -> Result<Document, StoreError> {
        decode(&self.read_bytes(DOCUMENTS, key)?)
    }

    fn insert(&self, key: &str, doc: &Document) -> Result<(), StoreError> {
        self.write_document(key, doc, false)
    }

    fn replace(&self, key: &str, doc: &Document) -> Result<(), StoreError> {
        self.write_document(key, doc, true)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.delete(DOCUMENTS, key)
    }

    fn increment_counter(&self, key: &str, delta: u64) -> Result<u64, StoreError> {
        let write_txn = self.db.begin_write().map_err(backend)?;
        let next = {
            let mut table = write_txn.open_table(COUNTERS).map_err(backend)?;
            let current = table
                .get(key)
                .map_err(backend)?
                .map(|v| v.value())
                .unwrap_or(0);
            let next = current.saturating_add(delta);
            table.insert(key, next).map_err(backend)?;
            next
        };
        write_txn.commit().map_err(backend)?;
        Ok(next)
    }

    fn get_binary(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.read_bytes(BINARIES, key)
    }

    fn upsert_binary(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(BINARIES).map_err(backend)?;
            table.insert(key, bytes).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)
    }

    fn remove_binary(&self, key: &str) -> Result<(), StoreError> {
        self.delete(BINARIES, key)
    }

    fn ensure_index(&self, definition: &IndexDefinition) -> Result<bool, StoreError> {
        Ok(self.indexes.lock().register(definition))
    }

    fn query(
        &self,
        index: &str,
        range: &KeyRange,
        consistency: Consistency,
    ) -> Result<Vec<IndexRow>, StoreError> {
        self.indexes
            .lock()
            .query(index, range, consistency, || self.scan_documents())
    }
}

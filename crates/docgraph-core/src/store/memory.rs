//! In-process `DocumentStore` backed by ordered maps.

use super::{Consistency, Document, DocumentStore, IndexCatalog, IndexDefinition, IndexRow, KeyRange};
use crate::types::StoreError;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Volatile store; everything is lost when it is dropped.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, Document>>,
    binaries: RwLock<BTreeMap<String, Vec<u8>>>,
    counters: Mutex<BTreeMap<String, u64>>,
    indexes: Mutex<IndexCatalog>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("documents", &self.documents.read().len())
            .field("binaries", &self.binaries.read().len())
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Document, StoreError> {
        self.documents
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn insert(&self, key: &str, doc: &Document) -> Result<(), StoreError> {
        match self.documents.write().entry(key.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(doc.clone());
                Ok(())
            }
        }
    }

    fn replace(&self, key: &str, doc: &Document) -> Result<(), StoreError> {
        match self.documents.write().get_mut(key) {
            Some(existing) => {
                *existing = doc.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.documents
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn increment_counter(&self, key: &str, delta: u64) -> Result<u64, StoreError> {
        let mut counters = self.counters.lock();
        let value = counters.entry(key.to_string()).or_insert(0);
        *value = value.saturating_add(delta);
        Ok(*value)
    }

    fn get_binary(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.binaries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn upsert_binary(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.binaries.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove_binary(&self, key: &str) -> Result<(), StoreError> {
        self.binaries
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
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
        self.indexes.lock().query(index, range, consistency, || {
            Ok(self
                .documents
                .read()
                .iter()
                .map(|(key, doc)| (key.clone(), doc.clone()))
                .collect())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_get_replace_remove() {
        let store = MemoryStore::new();
        store.insert("k", &json!({"a": 1})).unwrap();
        assert_eq!(store.get("k").unwrap(), json!({"a": 1}));

        assert_eq!(
            store.insert("k", &json!({})),
            Err(StoreError::AlreadyExists("k".into()))
        );

        store.replace("k", &json!({"a": 2})).unwrap();
        assert_eq!(store.get("k").unwrap()["a"], json!(2));

        store.remove("k").unwrap();
        assert_eq!(store.get("k"), Err(StoreError::NotFound("k".into())));
        assert!(store.remove("k").is_err());
        assert!(store.replace("k", &json!({})).is_err());
    }

    #[test]
    fn counter_starts_at_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.increment_counter("c", 1).unwrap(), 1);
        assert_eq!(store.increment_counter("c", 1).unwrap(), 2);
        assert_eq!(store.increment_counter("other", 5).unwrap(), 5);
    }

    #[test]
    fn binaries_are_separate_from_documents() {
        let store = MemoryStore::new();
        store.upsert_binary("al_1", b"abc").unwrap();
        store.upsert_binary("al_1", b"xyz").unwrap();
        assert_eq!(store.get_binary("al_1").unwrap(), b"xyz");
        assert!(store.get("al_1").is_err());
        store.remove_binary("al_1").unwrap();
        assert!(store.get_binary("al_1").is_err());
    }

    #[test]
    fn query_sees_new_documents_when_fresh() {
        fn all(key: &str, _doc: &Document) -> Vec<Document> {
            vec![json!(key)]
        }
        let store = MemoryStore::new();
        assert!(
            store
                .ensure_index(&IndexDefinition::new("all", all))
                .unwrap()
        );
        store.insert("x", &json!({})).unwrap();
        assert_eq!(
            store
                .query("all", &KeyRange::All, Consistency::Fresh)
                .unwrap()
                .len(),
            1
        );

        store.insert("y", &json!({})).unwrap();
        assert_eq!(
            store
                .query("all", &KeyRange::All, Consistency::Stale)
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            store
                .query("all", &KeyRange::All, Consistency::Fresh)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn concurrent_counter_increments_are_unique() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| store.increment_counter("c", 1).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
    }
}

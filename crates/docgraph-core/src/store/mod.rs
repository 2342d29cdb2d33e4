//! # Document Store
//!
//! The key/value surface the graph is written against.
//!
//! A `DocumentStore` holds three kinds of entries:
//! - JSON documents (vertices and edges)
//! - binary documents (externally stored adjacency lists)
//! - atomic counters (vertex id allocation)
//!
//! and answers queries against named secondary indexes built from the JSON
//! documents. All calls are blocking; implementations must be shareable
//! across threads.
//!
//! ## Backends
//!
//! - `MemoryStore`: process-local maps, used by tests and the benches
//! - `RedbStore`: embedded on-disk database (redb)

mod index;
mod memory;
mod redb_store;

pub use index::{Consistency, IndexCatalog, IndexDefinition, IndexMapFn, IndexRow, KeyRange, collate};
pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::types::StoreError;
use rayon::prelude::*;

/// Generic JSON form of a stored document.
pub type Document = serde_json::Value;

/// Blocking document key/value store with secondary indexes.
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Fetch a JSON document.
    fn get(&self, key: &str) -> Result<Document, StoreError>;

    /// Store a new JSON document; fails with `AlreadyExists` if the key is taken.
    fn insert(&self, key: &str, doc: &Document) -> Result<(), StoreError>;

    /// Overwrite an existing JSON document; fails with `NotFound` otherwise.
    fn replace(&self, key: &str, doc: &Document) -> Result<(), StoreError>;

    /// Delete a JSON document; fails with `NotFound` if absent.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically add `delta` to a counter (missing counters start at 0) and
    /// return the new value.
    fn increment_counter(&self, key: &str, delta: u64) -> Result<u64, StoreError>;

    fn get_binary(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Create or overwrite a binary document.
    fn upsert_binary(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn remove_binary(&self, key: &str) -> Result<(), StoreError>;

    /// Register an index. Returns false if one with that name already exists.
    fn ensure_index(&self, definition: &IndexDefinition) -> Result<bool, StoreError>;

    /// Query a registered index. Unknown names fail with `IndexNotReady`.
    fn query(
        &self,
        index: &str,
        range: &KeyRange,
        consistency: Consistency,
    ) -> Result<Vec<IndexRow>, StoreError>;

    /// Fetch many documents concurrently.
    ///
    /// Results come back in request order; each key fails independently.
    fn get_many(&self, keys: &[String]) -> Vec<Result<Document, StoreError>> {
        keys.par_iter().map(|key| self.get(key)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_many_keeps_request_order_and_reports_misses() {
        let store = MemoryStore::new();
        for i in 0..32 {
            store.insert(&format!("k{i}"), &json!({ "n": i })).unwrap();
        }

        let mut keys: Vec<String> = (0..32).rev().map(|i| format!("k{i}")).collect();
        keys.push("missing".to_string());

        let results = store.get_many(&keys);
        assert_eq!(results.len(), 33);
        assert_eq!(results[0].as_ref().unwrap()["n"], json!(31));
        assert_eq!(results[31].as_ref().unwrap()["n"], json!(0));
        assert_eq!(
            results[32].as_ref().unwrap_err(),
            &StoreError::NotFound("missing".into())
        );
    }
}

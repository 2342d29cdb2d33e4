//! # Secondary Indexes
//!
//! The five built-in indexes the graph queries, and the polling wrapper used
//! to query them.
//!
//! | Index             | Emits, per document                     |
//! |-------------------|-----------------------------------------|
//! | `all_vertices`    | the key of every vertex                 |
//! | `all_edges`       | the key of every edge                   |
//! | `all_edge_labels` | the label of every edge                 |
//! | `vertex_props`    | `[name, value]` per vertex property     |
//! | `edge_props`      | `[name, value]` per edge property       |
//!
//! Index names are qualified with the configured namespace
//! (`<namespace>/<name>`).

use crate::config::IndexSettings;
use crate::primitives::{
    EDGE_TYPE, FIELD_LABEL, FIELD_PROPS, FIELD_TYPE, INDEX_ALL_EDGE_LABELS, INDEX_ALL_EDGES,
    INDEX_ALL_VERTICES, INDEX_EDGE_PROPS, INDEX_VERTEX_PROPS, VERTEX_TYPE,
};
use crate::store::{Consistency, Document, DocumentStore, IndexDefinition, IndexRow, KeyRange};
use crate::types::{GraphError, StoreError};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

// =============================================================================
// MAP FUNCTIONS
// =============================================================================

fn is_kind(doc: &Document, kind: &str) -> bool {
    doc.get(FIELD_TYPE).and_then(Value::as_str) == Some(kind)
}

fn emit_key(key: &str, doc: &Document, kind: &str) -> Vec<Document> {
    if is_kind(doc, kind) {
        vec![Value::String(key.to_string())]
    } else {
        Vec::new()
    }
}

fn emit_props(doc: &Document, kind: &str) -> Vec<Document> {
    if !is_kind(doc, kind) {
        return Vec::new();
    }
    doc.get(FIELD_PROPS)
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, value)| compound_key(name, value))
                .collect()
        })
        .unwrap_or_default()
}

fn map_all_vertices(key: &str, doc: &Document) -> Vec<Document> {
    emit_key(key, doc, VERTEX_TYPE)
}

fn map_all_edges(key: &str, doc: &Document) -> Vec<Document> {
    emit_key(key, doc, EDGE_TYPE)
}

fn map_all_edge_labels(_key: &str, doc: &Document) -> Vec<Document> {
    if !is_kind(doc, EDGE_TYPE) {
        return Vec::new();
    }
    doc.get(FIELD_LABEL).cloned().into_iter().collect()
}

fn map_vertex_props(_key: &str, doc: &Document) -> Vec<Document> {
    emit_props(doc, VERTEX_TYPE)
}

fn map_edge_props(_key: &str, doc: &Document) -> Vec<Document> {
    emit_props(doc, EDGE_TYPE)
}

/// Key emitted by the property indexes: `[name, value]`.
#[must_use]
pub fn compound_key(name: &str, value: &Value) -> Value {
    json!([name, value])
}

// =============================================================================
// INDEX MANAGER
// =============================================================================

/// Registers the built-in indexes and queries them with bounded retries.
#[derive(Debug, Clone)]
pub struct IndexManager {
    namespace: String,
    consistency: Consistency,
    retries: u32,
    retry_delay: Duration,
}

impl IndexManager {
    #[must_use]
    pub fn new(settings: &IndexSettings) -> Self {
        Self {
            namespace: settings.namespace.clone(),
            consistency: if settings.stale {
                Consistency::Stale
            } else {
                Consistency::Fresh
            },
            retries: settings.retries.max(1),
            retry_delay: settings.retry_delay(),
        }
    }

    /// `<namespace>/<name>`
    #[must_use]
    pub fn qualified(&self, name: &str) -> String {
        format!("{}/{}", self.namespace, name)
    }

    /// The built-in definitions, under their qualified names.
    #[must_use]
    pub fn definitions(&self) -> Vec<IndexDefinition> {
        let builtin: [(&str, fn(&str, &Document) -> Vec<Document>); 5] = [
            (INDEX_ALL_VERTICES, map_all_vertices),
            (INDEX_ALL_EDGES, map_all_edges),
            (INDEX_ALL_EDGE_LABELS, map_all_edge_labels),
            (INDEX_VERTEX_PROPS, map_vertex_props),
            (INDEX_EDGE_PROPS, map_edge_props),
        ];
        builtin
            .into_iter()
            .map(|(name, map)| IndexDefinition::new(self.qualified(name), map))
            .collect()
    }

    /// Register every built-in index that is not yet present.
    ///
    /// Returns how many were created.
    pub fn ensure_all(&self, store: &dyn DocumentStore) -> Result<usize, GraphError> {
        let mut created = 0;
        for definition in self.definitions() {
            if store.ensure_index(&definition)? {
                debug!(index = %definition.name, "index created");
                created += 1;
            }
        }
        info!(namespace = %self.namespace, created, "indexes ready");
        Ok(created)
    }

    /// Query one built-in index by its unqualified name.
    ///
    /// An index that stays unavailable for every attempt yields an empty
    /// result instead of an error.
    pub fn query(
        &self,
        store: &dyn DocumentStore,
        name: &str,
        range: &KeyRange,
    ) -> Result<Vec<IndexRow>, GraphError> {
        let qualified = self.qualified(name);
        for attempt in 1..=self.retries {
            match store.query(&qualified, range, self.consistency) {
                Ok(rows) => return Ok(rows),
                Err(StoreError::IndexNotReady(_)) => {
                    debug!(index = %qualified, attempt, "index not ready");
                    if attempt < self.retries {
                        thread::sleep(self.retry_delay);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        warn!(index = %qualified, attempts = self.retries, "index unavailable, returning no rows");
        Ok(Vec::new())
    }

    /// Distinct labels of all edges in the graph.
    pub fn edge_labels(&self, store: &dyn DocumentStore) -> Result<BTreeSet<String>, GraphError> {
        Ok(self
            .query(store, INDEX_ALL_EDGE_LABELS, &KeyRange::All)?
            .into_iter()
            .filter_map(|row| match row.key {
                Value::String(label) => Some(label),
                _ => None,
            })
            .collect())
    }
}

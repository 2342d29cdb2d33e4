//! # Element Store
//!
//! Shared document lifecycle for vertices and edges: load, refresh,
//! property access, persist, delete.
//!
//! ## Refresh Policy
//!
//! - `Always`: every read or write re-fetches the document first, so changes
//!   made through other views are picked up (one extra round trip per call).
//! - `Cached`: the document is fetched once; later calls use the copy in
//!   memory and a concurrent writer's changes can be overwritten.
//!
//! ## Lifecycle
//!
//! ```text
//! Unloaded --refresh--> Loaded --delete--> Removed
//! ```
//!
//! A removed element has no cached document, so the next access goes to the
//! store and fails with `DocNotFound`.

use crate::adjacency::AdjacencyCodec;
use crate::indexes::IndexManager;
use crate::store::DocumentStore;
use crate::types::{GraphError, Properties, StoreError, StoredDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// When a view re-reads its document from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPolicy {
    /// Re-fetch before every operation.
    #[default]
    Always,
    /// Fetch once, then work from the cached copy.
    Cached,
}

/// Everything an element view needs to reach the store.
pub struct GraphContext {
    pub store: Arc<dyn DocumentStore>,
    pub codec: AdjacencyCodec,
    pub refresh: RefreshPolicy,
    pub indexes: IndexManager,
}

impl fmt::Debug for GraphContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphContext")
            .field("store", &self.store.name())
            .field("codec", &self.codec)
            .field("refresh", &self.refresh)
            .field("indexes", &self.indexes)
            .finish()
    }
}

/// Common operations of vertices and edges.
pub trait Element {
    /// Id without the key prefix.
    fn id(&self) -> &str;

    /// Full document key.
    fn key(&self) -> &str;

    /// Re-fetch the document if the refresh policy asks for it.
    /// Returns true when a fetch happened.
    fn refresh(&mut self) -> Result<bool, GraphError>;

    fn property(&mut self, name: &str) -> Result<Option<Value>, GraphError>;

    fn property_keys(&mut self) -> Result<Vec<String>, GraphError>;

    /// Store a property and persist the document.
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), GraphError>;

    /// Drop a property and persist the document. Returns the old value.
    fn remove_property(&mut self, name: &str) -> Result<Option<Value>, GraphError>;

    /// Delete the element from the store.
    fn remove(&mut self) -> Result<(), GraphError>;
}

/// One typed document plus its refresh bookkeeping.
#[derive(Clone)]
pub struct ElementStore<D> {
    key: String,
    policy: RefreshPolicy,
    store: Arc<dyn DocumentStore>,
    cached: Option<D>,
    /// Bumped on every fetch from the store.
    generation: u64,
}

impl<D> fmt::Debug for ElementStore<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementStore")
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("loaded", &self.cached.is_some())
            .field("generation", &self.generation)
            .finish()
    }
}

impl<D: StoredDocument> ElementStore<D> {
    /// A view that has not fetched anything yet.
    pub fn new(key: impl Into<String>, policy: RefreshPolicy, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            key: key.into(),
            policy,
            store,
            cached: None,
            generation: 0,
        }
    }

    /// A view over a document that was just written or fetched by the caller.
    pub fn with_document(
        key: impl Into<String>,
        policy: RefreshPolicy,
        store: Arc<dyn DocumentStore>,
        doc: D,
    ) -> Self {
        Self {
            key: key.into(),
            policy,
            store,
            cached: Some(doc),
            generation: 1,
        }
    }

    /// Build a typed document from its stored JSON form.
    pub fn parse(key: &str, raw: Value) -> Result<D, GraphError> {
        let doc: D = serde_json::from_value(raw)
            .map_err(|e| GraphError::Serialization(format!("{key}: {e}")))?;
        if doc.kind() != D::KIND {
            return Err(GraphError::InvalidArgument(format!(
                "{key} is a {} document, expected {}",
                doc.kind(),
                D::KIND
            )));
        }
        Ok(doc)
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fetch when nothing is cached or the policy is `Always`.
    pub fn refresh(&mut self) -> Result<bool, GraphError> {
        if self.cached.is_none() || self.policy == RefreshPolicy::Always {
            self.reload()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Fetch unconditionally.
    pub fn reload(&mut self) -> Result<(), GraphError> {
        let raw = self
            .store
            .get(&self.key)
            .map_err(|source| GraphError::not_found(self.key.clone(), source))?;
        let doc = Self::parse(&self.key, raw).inspect_err(|e| {
            error!(key = %self.key, error = %e, "stored document is malformed");
        })?;
        self.cached = Some(doc);
        self.generation = self.generation.wrapping_add(1);
        debug!(key = %self.key, generation = self.generation, "document fetched");
        Ok(())
    }

    /// The cached document, without refreshing.
    pub fn document(&self) -> Result<&D, GraphError> {
        self.cached.as_ref().ok_or_else(|| self.missing())
    }

    pub fn document_mut(&mut self) -> Result<&mut D, GraphError> {
        let key = &self.key;
        self.cached
            .as_mut()
            .ok_or_else(|| GraphError::not_found(key.clone(), StoreError::NotFound(key.clone())))
    }

    /// Refresh per policy, then borrow the document.
    pub fn load(&mut self) -> Result<&D, GraphError> {
        self.refresh()?;
        self.document()
    }

    /// Write the cached document back over the stored one.
    pub fn persist(&self) -> Result<(), GraphError> {
        let doc = self.document()?;
        let raw = serde_json::to_value(doc)
            .map_err(|e| GraphError::Serialization(format!("{}: {e}", self.key)))?;
        self.store.replace(&self.key, &raw).map_err(|e| match e {
            StoreError::NotFound(_) => GraphError::not_found(self.key.clone(), e),
            other => GraphError::Store(other),
        })
    }

    /// Delete the stored document and forget the cached copy.
    pub fn delete(&mut self) -> Result<(), GraphError> {
        self.cached = None;
        self.store.remove(&self.key).map_err(|e| match e {
            StoreError::NotFound(_) => GraphError::not_found(self.key.clone(), e),
            other => GraphError::Store(other),
        })?;
        debug!(key = %self.key, "document removed");
        Ok(())
    }

    pub fn property(&mut self, name: &str) -> Result<Option<Value>, GraphError> {
        Ok(self.load()?.props().get(name).cloned())
    }

    pub fn property_keys(&mut self) -> Result<Vec<String>, GraphError> {
        Ok(self.load()?.props().keys().cloned().collect())
    }

    pub fn set_property(&mut self, name: &str, value: Value) -> Result<(), GraphError> {
        validate_property_name(name)?;
        self.refresh()?;
        self.document_mut()?
            .props_mut()
            .insert(name.to_string(), value);
        self.persist()
    }

    pub fn remove_property(&mut self, name: &str) -> Result<Option<Value>, GraphError> {
        self.refresh()?;
        let previous = self.document_mut()?.props_mut().remove(name);
        if previous.is_some() {
            self.persist()?;
        }
        Ok(previous)
    }

    /// Snapshot of all properties.
    pub fn properties(&mut self) -> Result<Properties, GraphError> {
        Ok(self.load()?.props().clone())
    }

    fn missing(&self) -> GraphError {
        GraphError::not_found(self.key.clone(), StoreError::NotFound(self.key.clone()))
    }
}

fn validate_property_name(name: &str) -> Result<(), GraphError> {
    if name.is_empty() {
        return Err(GraphError::InvalidArgument(
            "property name must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{EdgeDocument, VertexDocument};
    use serde_json::json;

    fn edge_store(policy: RefreshPolicy) -> (Arc<dyn DocumentStore>, ElementStore<EdgeDocument>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let doc = EdgeDocument::new("v_a", "knows", "v_b");
        store
            .insert("e_1", &serde_json::to_value(&doc).unwrap())
            .unwrap();
        let element = ElementStore::new("e_1", policy, Arc::clone(&store));
        (store, element)
    }

    #[test]
    fn first_access_fetches() {
        let (_store, mut element) = edge_store(RefreshPolicy::Cached);
        assert!(element.refresh().unwrap());
        assert!(!element.refresh().unwrap());
        assert_eq!(element.generation(), 1);
    }

    #[test]
    fn set_and_remove_property() {
        let (store, mut element) = edge_store(RefreshPolicy::Always);
        element.set_property("weight", json!(3)).unwrap();
        assert_eq!(store.get("e_1").unwrap()["props"]["weight"], json!(3));
        assert_eq!(element.property("weight").unwrap(), Some(json!(3)));
        assert_eq!(element.property_keys().unwrap(), vec!["weight".to_string()]);

        assert_eq!(element.remove_property("weight").unwrap(), Some(json!(3)));
        assert_eq!(element.property("weight").unwrap(), None);
        assert_eq!(element.remove_property("weight").unwrap(), None);
    }

    #[test]
    fn empty_property_name_rejected() {
        let (_store, mut element) = edge_store(RefreshPolicy::Always);
        assert!(matches!(
            element.set_property("", json!(1)),
            Err(GraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn wrong_kind_rejected() {
        let (store, _) = edge_store(RefreshPolicy::Always);
        let mut as_vertex: ElementStore<VertexDocument> =
            ElementStore::new("e_1", RefreshPolicy::Always, store);
        assert!(matches!(
            as_vertex.refresh(),
            Err(GraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn removed_element_reports_not_found() {
        let (_store, mut element) = edge_store(RefreshPolicy::Cached);
        element.refresh().unwrap();
        element.delete().unwrap();
        assert!(element.property("x").unwrap_err().is_not_found());
        assert!(element.delete().unwrap_err().is_not_found());
    }

    #[test]
    fn missing_document_is_not_found() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut element: ElementStore<EdgeDocument> =
            ElementStore::new("e_nope", RefreshPolicy::Always, store);
        let err = element.refresh().unwrap_err();
        assert!(matches!(err, GraphError::DocNotFound { ref key, .. } if key == "e_nope"));
    }

    #[test]
    fn cached_policy_does_not_see_foreign_writes() {
        let (store, mut element) = edge_store(RefreshPolicy::Cached);
        element.refresh().unwrap();

        let mut other: ElementStore<EdgeDocument> =
            ElementStore::new("e_1", RefreshPolicy::Always, Arc::clone(&store));
        other.set_property("color", json!("red")).unwrap();

        assert_eq!(element.property("color").unwrap(), None);
        element.reload().unwrap();
        assert_eq!(element.property("color").unwrap(), Some(json!("red")));
    }
}

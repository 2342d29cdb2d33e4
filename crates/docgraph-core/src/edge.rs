//! # Edges
//!
//! `EdgeRepository` creates and loads edges; `Edge` is a view over one edge
//! document.
//!
//! Creating an edge takes three writes: the edge document, then the source's
//! outgoing list, then the target's incoming list. There is no rollback; a
//! failure part way leaves the earlier writes in place and is reported to
//! the caller.

use crate::element::{Element, ElementStore, GraphContext};
use crate::keys;
use crate::types::{Direction, EdgeDocument, GraphError, Properties, StoreError};
use crate::vertex::Vertex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// REPOSITORY
// =============================================================================

/// Creates and loads edges.
#[derive(Debug, Clone)]
pub struct EdgeRepository {
    ctx: Arc<GraphContext>,
}

impl EdgeRepository {
    #[must_use]
    pub fn new(ctx: Arc<GraphContext>) -> Self {
        Self { ctx }
    }

    /// Create `from -[label]-> to` and link it into both adjacency lists.
    ///
    /// The key is `e_<id>` for an explicit id, otherwise the structural key
    /// built from the two vertex ids and the label. If the key is already
    /// taken by the same `from -[label]-> to` edge, that edge is returned and
    /// nothing is relinked; an edge joining anything else under that key
    /// fails with `AlreadyExists`.
    ///
    /// Two distinct views of the same vertex are treated as a self-loop.
    pub fn create(
        &self,
        id: Option<&str>,
        from: &mut Vertex,
        label: &str,
        to: &mut Vertex,
    ) -> Result<Edge, GraphError> {
        if from.key() == to.key() {
            let edge = self.create_loop(id, from, label)?;
            to.reload()?;
            return Ok(edge);
        }

        from.refresh()?;
        to.refresh()?;

        let key = edge_key_for(id, from.id(), label, to.id())?;
        let doc = EdgeDocument::new(from.key(), label, to.key());
        let Some(edge) = self.insert_document(&key, doc)? else {
            return self.existing(&key, from.key(), label, to.key());
        };

        from.add_edge_ref(label, &key, Direction::Out)?;
        to.add_edge_ref(label, &key, Direction::In)?;
        info!(edge = %key, "edge created");
        Ok(edge)
    }

    /// Create a self-loop on `vertex`, recorded on both of its sides.
    pub fn create_loop(
        &self,
        id: Option<&str>,
        vertex: &mut Vertex,
        label: &str,
    ) -> Result<Edge, GraphError> {
        vertex.refresh()?;

        let key = edge_key_for(id, vertex.id(), label, vertex.id())?;
        let doc = EdgeDocument::new(vertex.key(), label, vertex.key());
        let Some(edge) = self.insert_document(&key, doc)? else {
            return self.existing(&key, vertex.key(), label, vertex.key());
        };

        vertex.add_edge_ref(label, &key, Direction::Both)?;
        info!(edge = %key, "self-loop created");
        Ok(edge)
    }

    /// Load the edge stored under `key`.
    pub fn get_by_key(&self, key: &str) -> Result<Edge, GraphError> {
        Edge::open(&self.ctx, key)
    }

    /// Load the edge with the given id (key `e_<id>`).
    pub fn get_by_id(&self, id: &str) -> Result<Edge, GraphError> {
        Edge::open(&self.ctx, &keys::edge_key_from_id(id))
    }

    /// The edge already stored under `key`, if it is `from -[label]-> to`.
    fn existing(&self, key: &str, from: &str, label: &str, to: &str) -> Result<Edge, GraphError> {
        let mut edge = self.get_by_key(key)?;
        let (stored_from, stored_to) = edge.endpoint_keys()?;
        if stored_from != from || stored_to != to || edge.label()? != label {
            warn!(edge = %key, from, to, label, "edge key taken by a different edge");
            return Err(GraphError::Store(StoreError::AlreadyExists(key.to_string())));
        }
        debug!(edge = %key, "edge already exists, returning the stored one");
        Ok(edge)
    }

    /// Insert a new edge document. `None` means the key was already taken.
    fn insert_document(&self, key: &str, doc: EdgeDocument) -> Result<Option<Edge>, GraphError> {
        let raw = serde_json::to_value(&doc)
            .map_err(|e| GraphError::Serialization(format!("{key}: {e}")))?;
        match self.ctx.store.insert(key, &raw) {
            Ok(()) => Ok(Some(Edge::from_document(&self.ctx, key, doc)?)),
            Err(StoreError::AlreadyExists(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn edge_key_for(
    id: Option<&str>,
    from_id: &str,
    label: &str,
    to_id: &str,
) -> Result<String, GraphError> {
    match id {
        Some("") => Err(GraphError::InvalidArgument(
            "edge id must not be empty".to_string(),
        )),
        Some(id) => Ok(keys::edge_key_from_id(id)),
        None => Ok(keys::edge_key(from_id, label, to_id)),
    }
}

// =============================================================================
// EDGE VIEW
// =============================================================================

/// A view over one edge document.
#[derive(Clone)]
pub struct Edge {
    id: String,
    ctx: Arc<GraphContext>,
    element: ElementStore<EdgeDocument>,
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("id", &self.id)
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

impl Edge {
    pub(crate) fn open(ctx: &Arc<GraphContext>, key: &str) -> Result<Self, GraphError> {
        let parts = keys::parse_edge_key(key)?;
        let mut edge = Self {
            id: parts.id,
            ctx: Arc::clone(ctx),
            element: ElementStore::new(key, ctx.refresh, Arc::clone(&ctx.store)),
        };
        edge.element.refresh()?;
        Ok(edge)
    }

    /// Build a view from a document fetched by the caller.
    pub(crate) fn from_raw(ctx: &Arc<GraphContext>, key: &str, raw: Value) -> Result<Self, GraphError> {
        let doc = ElementStore::<EdgeDocument>::parse(key, raw)?;
        Self::from_document(ctx, key, doc)
    }

    fn from_document(ctx: &Arc<GraphContext>, key: &str, doc: EdgeDocument) -> Result<Self, GraphError> {
        let parts = keys::parse_edge_key(key)?;
        Ok(Self {
            id: parts.id,
            ctx: Arc::clone(ctx),
            element: ElementStore::with_document(key, ctx.refresh, Arc::clone(&ctx.store), doc),
        })
    }

    pub fn label(&mut self) -> Result<String, GraphError> {
        Ok(self.element.load()?.label.clone())
    }

    /// Key of the source vertex.
    pub fn from_key(&mut self) -> Result<String, GraphError> {
        Ok(self.element.load()?.from.clone())
    }

    /// Key of the target vertex.
    pub fn to_key(&mut self) -> Result<String, GraphError> {
        Ok(self.element.load()?.to.clone())
    }

    /// `(from, to)` vertex keys from a single refresh.
    pub fn endpoint_keys(&mut self) -> Result<(String, String), GraphError> {
        let doc = self.element.load()?;
        Ok((doc.from.clone(), doc.to.clone()))
    }

    /// The target (`In`) or source (`Out`) vertex. `Both` is rejected.
    pub fn vertex(&mut self, direction: Direction) -> Result<Vertex, GraphError> {
        let key = match direction {
            Direction::In => self.to_key()?,
            Direction::Out => self.from_key()?,
            Direction::Both => {
                return Err(GraphError::InvalidArgument(
                    "an edge endpoint is either in or out, not both".to_string(),
                ));
            }
        };
        Vertex::open_key(&self.ctx, &key)
    }

    pub fn properties(&mut self) -> Result<Properties, GraphError> {
        self.element.properties()
    }

    /// The stored document as JSON.
    pub fn to_document(&mut self) -> Result<Value, GraphError> {
        let doc = self.element.load()?;
        serde_json::to_value(doc).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    /// Drop this edge from one endpoint's adjacency lists. Failures are
    /// logged, never returned.
    fn unlink(&self, vertex_key: &str, label: &str, direction: Direction) {
        let result = Vertex::open_key(&self.ctx, vertex_key)
            .and_then(|mut vertex| vertex.remove_edge_ref(label, self.element.key(), direction));
        match result {
            Ok(true) => {}
            Ok(false) => {
                debug!(edge = %self.element.key(), vertex = %vertex_key, "edge was not linked");
            }
            Err(e) => {
                warn!(edge = %self.element.key(), vertex = %vertex_key, error = %e, "could not unlink edge");
            }
        }
    }
}

impl Element for Edge {
    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        self.element.key()
    }

    fn refresh(&mut self) -> Result<bool, GraphError> {
        self.element.refresh()
    }

    fn property(&mut self, name: &str) -> Result<Option<Value>, GraphError> {
        self.element.property(name)
    }

    fn property_keys(&mut self) -> Result<Vec<String>, GraphError> {
        self.element.property_keys()
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), GraphError> {
        self.element.set_property(name, value)
    }

    fn remove_property(&mut self, name: &str) -> Result<Option<Value>, GraphError> {
        self.element.remove_property(name)
    }

    /// Unlink from both endpoints, then delete the edge document.
    fn remove(&mut self) -> Result<(), GraphError> {
        let doc = self.element.load()?.clone();

        if doc.from == doc.to {
            self.unlink(&doc.from, &doc.label, Direction::Both);
        } else {
            self.unlink(&doc.from, &doc.label, Direction::Out);
            self.unlink(&doc.to, &doc.label, Direction::In);
        }

        self.element.delete()?;
        info!(edge = %self.element.key(), "edge removed");
        Ok(())
    }
}

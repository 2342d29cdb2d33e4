//! # Vertices
//!
//! `VertexRepository` creates and loads vertices; `Vertex` is a view over one
//! vertex document that maintains its adjacency lists and answers
//! traversals.
//!
//! ## Traversal
//!
//! Edge keys are read from the (decoded) adjacency lists, the edge documents
//! are fetched concurrently, and the far endpoint of each edge is resolved
//! with `Direction::far_end`. References to edge or vertex documents that no
//! longer exist are skipped with a warning.

use crate::adjacency::AdjacencyCodec;
use crate::edge::Edge;
use crate::element::{Element, ElementStore, GraphContext};
use crate::keys;
use crate::primitives::VERTEX_COUNTER_KEY;
use crate::types::{
    AdjacencyLists, Direction, Endpoint, GraphError, Properties, VertexDocument,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// =============================================================================
// REPOSITORY
// =============================================================================

/// Creates and loads vertices.
#[derive(Debug, Clone)]
pub struct VertexRepository {
    ctx: Arc<GraphContext>,
}

impl VertexRepository {
    #[must_use]
    pub fn new(ctx: Arc<GraphContext>) -> Self {
        Self { ctx }
    }

    /// Create a vertex with empty properties and adjacency lists.
    ///
    /// Without an explicit id the next value of the vertex counter is used.
    /// Fails with `AlreadyExists` (as a store error) if the key is taken,
    /// leaving the existing vertex and its adjacency lists untouched.
    pub fn create(&self, id: Option<&str>) -> Result<Vertex, GraphError> {
        let id = match id {
            Some("") => {
                return Err(GraphError::InvalidArgument(
                    "vertex id must not be empty".to_string(),
                ));
            }
            Some(id) => id.to_string(),
            None => self.next_id()?,
        };

        let key = keys::vertex_key(&id);
        let adjacency = AdjacencyLists::new();
        let doc = VertexDocument::new(self.ctx.codec.reserve(&id, &adjacency)?);
        let raw = serde_json::to_value(&doc)
            .map_err(|e| GraphError::Serialization(format!("{key}: {e}")))?;
        self.ctx.store.insert(&key, &raw)?;

        // The side document is only written once the key is ours.
        if self.ctx.codec.stores_outside() {
            if let Err(e) = self.ctx.codec.encode(&id, &adjacency) {
                if let Err(undo) = self.ctx.store.remove(&key) {
                    warn!(vertex = %id, error = %undo, "could not remove half-created vertex");
                }
                return Err(e);
            }
        }

        debug!(vertex = %id, "vertex created");
        Ok(Vertex {
            element: ElementStore::with_document(
                key,
                self.ctx.refresh,
                Arc::clone(&self.ctx.store),
                doc,
            ),
            id,
            ctx: Arc::clone(&self.ctx),
            adjacency,
            decoded: Some(1),
        })
    }

    /// Load the vertex with the given id.
    pub fn get_by_id(&self, id: &str) -> Result<Vertex, GraphError> {
        Vertex::open(&self.ctx, id)
    }

    /// Load the vertex stored under `v_<id>`.
    pub fn get_by_key(&self, key: &str) -> Result<Vertex, GraphError> {
        Vertex::open_key(&self.ctx, key)
    }

    /// Allocate the next vertex id from the store counter.
    pub fn next_id(&self) -> Result<String, GraphError> {
        self.ctx
            .store
            .increment_counter(VERTEX_COUNTER_KEY, 1)
            .map(|n| n.to_string())
            .map_err(GraphError::IdGeneration)
    }
}

// =============================================================================
// VERTEX VIEW
// =============================================================================

/// A view over one vertex document.
#[derive(Clone)]
pub struct Vertex {
    id: String,
    ctx: Arc<GraphContext>,
    element: ElementStore<VertexDocument>,
    /// Decoded form of the document's `edges` field.
    adjacency: AdjacencyLists,
    /// Element generation `adjacency` was decoded from.
    decoded: Option<u64>,
}

impl fmt::Debug for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vertex")
            .field("id", &self.id)
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

impl Vertex {
    pub(crate) fn open(ctx: &Arc<GraphContext>, id: &str) -> Result<Self, GraphError> {
        let mut vertex = Self {
            id: id.to_string(),
            ctx: Arc::clone(ctx),
            element: ElementStore::new(keys::vertex_key(id), ctx.refresh, Arc::clone(&ctx.store)),
            adjacency: AdjacencyLists::new(),
            decoded: None,
        };
        vertex.sync()?;
        Ok(vertex)
    }

    pub(crate) fn open_key(ctx: &Arc<GraphContext>, key: &str) -> Result<Self, GraphError> {
        Self::open(ctx, keys::parse_vertex_id(key)?)
    }

    /// Refresh per policy and decode the adjacency lists if a new document
    /// generation was fetched.
    fn sync(&mut self) -> Result<bool, GraphError> {
        let fetched = self.element.refresh()?;
        self.decode_current()?;
        Ok(fetched)
    }

    /// Decode the adjacency lists of the held document unless that
    /// generation is already decoded.
    fn decode_current(&mut self) -> Result<(), GraphError> {
        let generation = self.element.generation();
        if self.decoded == Some(generation) {
            return Ok(());
        }
        let encoded = &self.element.document()?.edges;
        self.adjacency = self
            .ctx
            .codec
            .decode(&self.id, encoded)
            .inspect_err(|e| {
                error!(vertex = %self.id, error = %e, "could not decode adjacency lists");
            })?;
        self.decoded = Some(generation);
        Ok(())
    }

    /// Fetch the document unconditionally, whatever the refresh policy.
    pub fn reload(&mut self) -> Result<(), GraphError> {
        self.element.reload()?;
        self.decode_current()
    }

    fn store_adjacency(&mut self) -> Result<(), GraphError> {
        let encoded = self.ctx.codec.encode(&self.id, &self.adjacency)?;
        self.element.document_mut()?.edges = encoded;
        self.element.persist()
    }

    /// Current adjacency lists.
    pub fn adjacency(&mut self) -> Result<&AdjacencyLists, GraphError> {
        self.sync()?;
        Ok(&self.adjacency)
    }

    /// Record `edge_key` under `label` and persist.
    ///
    /// `Both` records a self-loop on the incoming and outgoing side.
    pub fn add_edge_ref(
        &mut self,
        label: &str,
        edge_key: &str,
        direction: Direction,
    ) -> Result<(), GraphError> {
        self.sync()?;
        AdjacencyCodec::add_ref(&mut self.adjacency, label, edge_key, direction);
        self.store_adjacency()
    }

    /// Forget `edge_key` under `label` and persist.
    ///
    /// Returns false (and writes nothing) if the key was not recorded.
    pub fn remove_edge_ref(
        &mut self,
        label: &str,
        edge_key: &str,
        direction: Direction,
    ) -> Result<bool, GraphError> {
        self.sync()?;
        if !AdjacencyCodec::remove_ref(&mut self.adjacency, label, edge_key, direction) {
            return Ok(false);
        }
        self.store_adjacency()?;
        Ok(true)
    }

    /// Edges on the given side(s) with one of `labels`.
    ///
    /// With no labels, every label known to the graph's label index is used.
    /// A self-loop is reported once even for `Both`.
    pub fn edges(&mut self, direction: Direction, labels: &[&str]) -> Result<Vec<Edge>, GraphError> {
        let labels: Vec<String> = if labels.is_empty() {
            self.ctx
                .indexes
                .edge_labels(self.ctx.store.as_ref())?
                .into_iter()
                .collect()
        } else {
            labels.iter().map(|l| (*l).to_string()).collect()
        };

        self.sync()?;
        let refs = AdjacencyCodec::refs_for(&self.adjacency, direction, &labels);
        self.fetch_edges(&refs)
    }

    /// Every edge recorded in either adjacency list, whatever its label.
    pub fn all_edges(&mut self) -> Result<Vec<Edge>, GraphError> {
        self.sync()?;
        let refs = self.adjacency.all_refs();
        self.fetch_edges(&refs)
    }

    /// Vertices at the far end of `edges(direction, labels)`.
    ///
    /// For `Both`, a self-loop yields this vertex once.
    pub fn vertices(&mut self, direction: Direction, labels: &[&str]) -> Result<Vec<Vertex>, GraphError> {
        let edges = self.edges(direction, labels)?;
        let own_key = self.key().to_string();
        let mut result = Vec::with_capacity(edges.len());

        for mut edge in edges {
            let (from, to) = edge.endpoint_keys()?;
            match direction.far_end(&own_key, &from, &to) {
                Some(Endpoint::This) => result.push(self.clone()),
                Some(Endpoint::Other(key)) => match Vertex::open_key(&self.ctx, key) {
                    Ok(vertex) => result.push(vertex),
                    Err(e) if e.is_not_found() => {
                        warn!(vertex = %self.id, edge = %edge.key(), missing = %key, "skipping dangling endpoint");
                    }
                    Err(e) => return Err(e),
                },
                None => {
                    warn!(vertex = %self.id, edge = %edge.key(), "edge does not touch this vertex");
                }
            }
        }
        Ok(result)
    }

    /// All properties.
    pub fn properties(&mut self) -> Result<Properties, GraphError> {
        self.element.properties()
    }

    /// The stored document as JSON, `edges` in its stored (possibly packed) form.
    pub fn to_document(&mut self) -> Result<Value, GraphError> {
        let doc = self.element.load()?;
        serde_json::to_value(doc).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    fn fetch_edges(&self, refs: &[String]) -> Result<Vec<Edge>, GraphError> {
        let fetched = self.ctx.store.get_many(refs);
        let mut edges = Vec::with_capacity(refs.len());

        for (key, result) in refs.iter().zip(fetched) {
            let loaded = result
                .map_err(|source| GraphError::not_found(key.clone(), source))
                .and_then(|raw| Edge::from_raw(&self.ctx, key, raw));
            match loaded {
                Ok(edge) => edges.push(edge),
                Err(e) if e.is_not_found() => {
                    warn!(vertex = %self.id, edge = %key, "skipping dangling edge reference");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(edges)
    }
}

impl Element for Vertex {
    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        self.element.key()
    }

    fn refresh(&mut self) -> Result<bool, GraphError> {
        self.sync()
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

    /// Remove every incident edge, then the vertex document and any external
    /// adjacency document.
    fn remove(&mut self) -> Result<(), GraphError> {
        let edges = self.all_edges()?;
        let count = edges.len();
        for mut edge in edges {
            match edge.remove() {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(vertex = %self.id, edge = %edge.key(), "edge already gone");
                }
                Err(e) => return Err(e),
            }
        }

        self.element.delete()?;
        self.adjacency = AdjacencyLists::new();
        self.decoded = None;
        if let Err(e) = self.ctx.codec.discard(&self.id) {
            warn!(vertex = %self.id, error = %e, "could not remove external adjacency lists");
        }

        info!(vertex = %self.id, edges = count, "vertex removed");
        Ok(())
    }
}

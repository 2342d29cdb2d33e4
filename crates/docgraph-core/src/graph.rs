//! # Graph Facade
//!
//! `DocGraph` is the entry point: it opens the store, registers the indexes,
//! wires the compression strategy and exposes the generic graph operations.
//!
//! Lookups and mutations that hit a missing document return `None` (or do
//! nothing) instead of failing; every other error propagates.

use crate::adjacency::AdjacencyCodec;
use crate::config::Settings;
use crate::connection::connect;
use crate::edge::{Edge, EdgeRepository};
use crate::element::{Element, GraphContext, RefreshPolicy};
use crate::indexes::{IndexManager, compound_key};
use crate::primitives::{
    INDEX_ALL_EDGE_LABELS, INDEX_ALL_EDGES, INDEX_ALL_VERTICES, INDEX_EDGE_PROPS,
    INDEX_VERTEX_PROPS,
};
use crate::store::{DocumentStore, IndexRow, KeyRange};
use crate::types::GraphError;
use crate::vertex::{Vertex, VertexRepository};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turn a missing-document failure into `None`, logging it.
fn absent_if_missing<T>(result: Result<T, GraphError>, context: &str) -> Result<Option<T>, GraphError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => {
            debug!(error = %e, context, "document missing");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Keep only the views whose documents could be loaded.
fn load_rows<T>(
    rows: Vec<IndexRow>,
    mut open: impl FnMut(&str) -> Result<T, GraphError>,
) -> Result<Vec<T>, GraphError> {
    let mut loaded = Vec::with_capacity(rows.len());
    for row in rows {
        match open(&row.id) {
            Ok(element) => loaded.push(element),
            Err(e) if e.is_not_found() => {
                warn!(key = %row.id, "indexed document no longer exists");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(loaded)
}

// =============================================================================
// FEATURES
// =============================================================================

/// What the graph supports, in the usual property-graph capability terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub ignores_supplied_ids: bool,
    pub is_persistent: bool,
    pub supports_duplicate_edges: bool,
    pub supports_self_loops: bool,
    pub supports_edge_iteration: bool,
    pub supports_vertex_iteration: bool,
    pub supports_edge_retrieval: bool,
    pub supports_edge_properties: bool,
    pub supports_vertex_properties: bool,
    pub supports_indices: bool,
    pub supports_key_indices: bool,
    pub supports_transactions: bool,
    pub supports_threaded_transactions: bool,
    pub supports_boolean_property: bool,
    pub supports_string_property: bool,
    pub supports_integer_property: bool,
    pub supports_long_property: bool,
    pub supports_double_property: bool,
    pub supports_float_property: bool,
    pub supports_map_property: bool,
    pub supports_uniform_list_property: bool,
    pub supports_mixed_list_property: bool,
    pub supports_primitive_array_property: bool,
    pub supports_serializable_object_property: bool,
}

impl Features {
    /// Capabilities for a graph over the given store backend.
    #[must_use]
    pub fn for_store(persistent: bool) -> Self {
        Self {
            ignores_supplied_ids: false,
            is_persistent: persistent,
            supports_duplicate_edges: false,
            supports_self_loops: true,
            supports_edge_iteration: true,
            supports_vertex_iteration: true,
            supports_edge_retrieval: true,
            supports_edge_properties: true,
            supports_vertex_properties: true,
            supports_indices: false,
            supports_key_indices: false,
            supports_transactions: false,
            supports_threaded_transactions: false,
            supports_boolean_property: true,
            supports_string_property: true,
            supports_integer_property: true,
            supports_long_property: true,
            supports_double_property: true,
            supports_float_property: false,
            supports_map_property: false,
            supports_uniform_list_property: false,
            supports_mixed_list_property: false,
            supports_primitive_array_property: false,
            supports_serializable_object_property: false,
        }
    }
}

// =============================================================================
// DOCGRAPH
// =============================================================================

/// A property graph stored in a document store.
#[derive(Debug)]
pub struct DocGraph {
    ctx: Arc<GraphContext>,
    vertices: VertexRepository,
    edges: EdgeRepository,
    features: Features,
}

impl DocGraph {
    /// Connect to the configured store and prepare the graph.
    pub fn open(settings: &Settings) -> Result<Self, GraphError> {
        settings.validate()?;
        let store = connect(&settings.store)?;
        Self::with_store(store, settings)
    }

    /// Prepare the graph over an already opened store.
    ///
    /// Registers the built-in indexes; the store settings are ignored.
    pub fn with_store(store: Arc<dyn DocumentStore>, settings: &Settings) -> Result<Self, GraphError> {
        let codec = AdjacencyCodec::new(settings.graph.compression.strategy(&store));
        let indexes = IndexManager::new(&settings.index);
        indexes.ensure_all(store.as_ref())?;

        let features = Features::for_store(store.name() != "memory");
        info!(
            store = store.name(),
            compression = %codec.mode(),
            refresh = ?settings.graph.refresh,
            "graph opened"
        );

        let ctx = Arc::new(GraphContext {
            store,
            codec,
            refresh: settings.graph.refresh,
            indexes,
        });
        Ok(Self {
            vertices: VertexRepository::new(Arc::clone(&ctx)),
            edges: EdgeRepository::new(Arc::clone(&ctx)),
            ctx,
            features,
        })
    }

    /// In-memory graph with default settings.
    pub fn in_memory() -> Result<Self, GraphError> {
        Self::open(&Settings::default())
    }

    #[must_use]
    pub fn features(&self) -> &Features {
        &self.features
    }

    #[must_use]
    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.ctx.refresh
    }

    // -------------------------------------------------------------------------
    // Vertices
    // -------------------------------------------------------------------------

    /// Create a vertex, with a generated id when `id` is `None`.
    pub fn add_vertex(&self, id: Option<&str>) -> Result<Vertex, GraphError> {
        self.vertices.create(id)
    }

    pub fn get_vertex(&self, id: &str) -> Result<Option<Vertex>, GraphError> {
        absent_if_missing(self.vertices.get_by_id(id), "get_vertex")
    }

    /// Remove a vertex and all its edges. A vertex that is already gone is
    /// ignored.
    pub fn remove_vertex(&self, vertex: &mut Vertex) -> Result<(), GraphError> {
        absent_if_missing(vertex.remove(), "remove_vertex").map(|_| ())
    }

    /// Every vertex in the graph, per the vertex index.
    pub fn vertices(&self) -> Result<Vec<Vertex>, GraphError> {
        let rows = self.query(INDEX_ALL_VERTICES, &KeyRange::All)?;
        load_rows(rows, |key| self.vertices.get_by_key(key))
    }

    /// Vertices whose property `name` equals `value`.
    pub fn vertices_by_property(&self, name: &str, value: &Value) -> Result<Vec<Vertex>, GraphError> {
        let rows = self.query(INDEX_VERTEX_PROPS, &KeyRange::Exact(compound_key(name, value)))?;
        load_rows(rows, |key| self.vertices.get_by_key(key))
    }

    // -------------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------------

    /// Create `from -[label]-> to`. Returns `None` if either endpoint no
    /// longer exists.
    pub fn add_edge(
        &self,
        id: Option<&str>,
        from: &mut Vertex,
        to: &mut Vertex,
        label: &str,
    ) -> Result<Option<Edge>, GraphError> {
        absent_if_missing(self.edges.create(id, from, label, to), "add_edge")
    }

    /// Create a self-loop on `vertex`.
    pub fn add_self_loop(
        &self,
        id: Option<&str>,
        vertex: &mut Vertex,
        label: &str,
    ) -> Result<Option<Edge>, GraphError> {
        absent_if_missing(self.edges.create_loop(id, vertex, label), "add_self_loop")
    }

    /// Look up an edge by id (key `e_<id>`).
    pub fn get_edge(&self, id: &str) -> Result<Option<Edge>, GraphError> {
        absent_if_missing(self.edges.get_by_id(id), "get_edge")
    }

    /// Remove an edge. An edge that is already gone is ignored.
    pub fn remove_edge(&self, edge: &mut Edge) -> Result<(), GraphError> {
        absent_if_missing(edge.remove(), "remove_edge").map(|_| ())
    }

    /// Every edge in the graph, per the edge index.
    pub fn edges(&self) -> Result<Vec<Edge>, GraphError> {
        let rows = self.query(INDEX_ALL_EDGES, &KeyRange::All)?;
        load_rows(rows, |key| self.edges.get_by_key(key))
    }

    /// Edges whose property `name` equals `value`.
    pub fn edges_by_property(&self, name: &str, value: &Value) -> Result<Vec<Edge>, GraphError> {
        let rows = self.query(INDEX_EDGE_PROPS, &KeyRange::Exact(compound_key(name, value)))?;
        load_rows(rows, |key| self.edges.get_by_key(key))
    }

    /// Edges carrying `label`.
    pub fn edges_by_label(&self, label: &str) -> Result<Vec<Edge>, GraphError> {
        let rows = self.query(
            INDEX_ALL_EDGE_LABELS,
            &KeyRange::Exact(Value::String(label.to_string())),
        )?;
        load_rows(rows, |key| self.edges.get_by_key(key))
    }

    /// Distinct labels in use.
    pub fn edge_labels(&self) -> Result<Vec<String>, GraphError> {
        Ok(self
            .ctx
            .indexes
            .edge_labels(self.ctx.store.as_ref())?
            .into_iter()
            .collect())
    }

    /// Release the graph's handle on the store.
    pub fn shutdown(self) {
        info!(store = self.ctx.store.name(), "graph shut down");
    }

    fn query(&self, index: &str, range: &KeyRange) -> Result<Vec<IndexRow>, GraphError> {
        self.ctx.indexes.query(self.ctx.store.as_ref(), index, range)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compression::CompressionMode;
    use crate::types::Direction;
    use serde_json::json;

    fn graph() -> DocGraph {
        DocGraph::in_memory().unwrap()
    }

    #[test]
    fn generated_ids_come_from_counter() {
        let g = graph();
        let a = g.add_vertex(None).unwrap();
        let b = g.add_vertex(None).unwrap();
        assert_eq!(a.id(), "1");
        assert_eq!(b.id(), "2");
        assert_eq!(a.key(), "v_1");
    }

    #[test]
    fn duplicate_vertex_id_fails() {
        let g = graph();
        g.add_vertex(Some("x")).unwrap();
        let err = g.add_vertex(Some("x")).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Store(crate::types::StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn missing_elements_are_none() {
        let g = graph();
        assert!(g.get_vertex("ghost").unwrap().is_none());
        assert!(g.get_edge("ghost").unwrap().is_none());
    }

    #[test]
    fn explicit_edge_id() {
        let g = graph();
        let mut a = g.add_vertex(Some("a")).unwrap();
        let mut b = g.add_vertex(Some("b")).unwrap();
        let edge = g.add_edge(Some("17"), &mut a, &mut b, "knows").unwrap().unwrap();
        assert_eq!(edge.key(), "e_17");
        assert_eq!(edge.id(), "17");

        let mut fetched = g.get_edge("17").unwrap().unwrap();
        assert_eq!(fetched.label().unwrap(), "knows");
        assert_eq!(fetched.vertex(Direction::In).unwrap().id(), "b");
    }

    #[test]
    fn add_edge_to_removed_vertex_is_none() {
        let g = graph();
        let mut a = g.add_vertex(Some("a")).unwrap();
        let mut b = g.add_vertex(Some("b")).unwrap();
        let mut doomed = b.clone();
        g.remove_vertex(&mut doomed).unwrap();
        assert!(g.add_edge(None, &mut a, &mut b, "knows").unwrap().is_none());
    }

    #[test]
    fn remove_twice_is_quiet() {
        let g = graph();
        let mut a = g.add_vertex(Some("a")).unwrap();
        g.remove_vertex(&mut a).unwrap();
        g.remove_vertex(&mut a).unwrap();
    }

    #[test]
    fn listing_and_property_lookup() {
        let g = graph();
        let mut a = g.add_vertex(Some("a")).unwrap();
        let mut b = g.add_vertex(Some("b")).unwrap();
        a.set_property("name", json!("alice")).unwrap();
        b.set_property("name", json!("bob")).unwrap();
        let mut e = g.add_edge(None, &mut a, &mut b, "knows").unwrap().unwrap();
        e.set_property("since", json!(2001)).unwrap();

        assert_eq!(g.vertices().unwrap().len(), 2);
        assert_eq!(g.edges().unwrap().len(), 1);

        let alices = g.vertices_by_property("name", &json!("alice")).unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].id(), "a");

        let old = g.edges_by_property("since", &json!(2001)).unwrap();
        assert_eq!(old.len(), 1);
        assert!(g.edges_by_property("since", &json!(1999)).unwrap().is_empty());

        assert_eq!(g.edge_labels().unwrap(), vec!["knows".to_string()]);
        assert_eq!(g.edges_by_label("knows").unwrap().len(), 1);
        assert!(g.edges_by_label("likes").unwrap().is_empty());
    }

    #[test]
    fn features_reflect_backend() {
        let g = graph();
        assert!(!g.features().is_persistent);
        assert!(!g.features().supports_duplicate_edges);
        assert!(g.features().supports_self_loops);
        assert!(!g.features().supports_float_property);
    }

    #[test]
    fn with_store_uses_configured_compression() {
        let store: Arc<dyn DocumentStore> = Arc::new(crate::store::MemoryStore::new());
        let mut settings = Settings::default();
        settings.graph.compression = CompressionMode::External;
        let g = DocGraph::with_store(Arc::clone(&store), &settings).unwrap();
        g.add_vertex(Some("tc")).unwrap();
        assert_eq!(store.get("v_tc").unwrap()["edges"], json!("al_tc"));
        assert!(store.get_binary("al_tc").is_ok());
        g.shutdown();
    }
}

//! # docgraph-core
//!
//! A property graph (vertices, labeled directed edges, properties) encoded
//! inside a document key/value store.
//!
//! ## Layout in the Store
//!
//! - one JSON document per vertex (`v_<id>`) holding its properties and its
//!   label-grouped incoming/outgoing edge keys (the adjacency lists)
//! - one JSON document per edge (`e_<from>->|<label>|-><to>`) holding its
//!   endpoints, label and properties
//! - optionally one binary document per vertex (`al_<id>`) holding its
//!   gzipped adjacency lists
//!
//! Traversal reads a vertex's adjacency lists and fetches the referenced edge
//! documents concurrently. Global listings go through secondary indexes.
//!
//! ## Architectural Constraints
//!
//! - Synchronous: every store call blocks; there is no async runtime
//! - The store handle is opened once and passed in explicitly
//! - Documents are typed structs; generic JSON only at the store boundary
//! - Adjacency compression is a strategy picked once at startup

// =============================================================================
// MODULES
// =============================================================================

pub mod adjacency;
pub mod compression;
pub mod config;
pub mod connection;
pub mod edge;
pub mod element;
pub mod graph;
pub mod indexes;
pub mod keys;
pub mod primitives;
pub mod store;
pub mod types;
pub mod vertex;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    AdjacencyLists, Direction, DocumentKind, EdgeDocument, EncodedAdjacency, Endpoint, GraphError,
    Properties, Side, StoreError, VertexDocument,
};

// =============================================================================
// RE-EXPORTS: Graph
// =============================================================================

pub use adjacency::AdjacencyCodec;
pub use compression::{CompressionMode, CompressionStrategy};
pub use config::{ConfigError, GraphSettings, IndexSettings, Settings, StoreBackend, StoreSettings};
pub use connection::connect;
pub use edge::{Edge, EdgeRepository};
pub use element::{Element, ElementStore, GraphContext, RefreshPolicy};
pub use graph::{DocGraph, Features};
pub use indexes::IndexManager;
pub use vertex::{Vertex, VertexRepository};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use store::{
    Consistency, Document, DocumentStore, IndexDefinition, IndexRow, KeyRange, MemoryStore,
    RedbStore,
};

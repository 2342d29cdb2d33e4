//! # Layout Primitives
//!
//! Fixed constants that define how the graph is laid out inside the store.
//!
//! Every document written by this crate is addressed and shaped by these
//! values. Changing any of them makes previously written data unreadable.
//!
//! ## Key Layout
//!
//! ```text
//! v_<vertexId>                     vertex document
//! e_<fromId>->|<label>|-><toId>    edge document (structural key)
//! e_<edgeId>                       edge document (explicit id)
//! al_<vertexId>                    externally stored adjacency lists
//! vertex_counter                   vertex id counter
//! ```

// =============================================================================
// KEY PREFIXES AND DELIMITERS
// =============================================================================

/// Prefix of every vertex document key.
pub const VERTEX_PREFIX: &str = "v_";

/// Prefix of every edge document key.
pub const EDGE_PREFIX: &str = "e_";

/// Prefix of the side binary document holding external adjacency lists.
pub const ADJACENCY_PREFIX: &str = "al_";

/// Separates the source vertex id from the label, and the label from the
/// target vertex id, in a structural edge id.
pub const EDGE_ARROW: &str = "->";

/// Surrounds the label in a structural edge id.
pub const LABEL_DELIMITER: &str = "|";

/// Counter document incremented to allocate vertex ids.
pub const VERTEX_COUNTER_KEY: &str = "vertex_counter";

// =============================================================================
// DOCUMENT FIELDS
// =============================================================================

// Read by the index map functions, which see raw JSON. The typed documents
// spell the same names in their serde attributes.
pub const FIELD_TYPE: &str = "type";
pub const FIELD_PROPS: &str = "props";
pub const FIELD_LABEL: &str = "label";

/// `type` value of vertex documents.
pub const VERTEX_TYPE: &str = "vertex";

/// `type` value of edge documents.
pub const EDGE_TYPE: &str = "edge";

// =============================================================================
// SECONDARY INDEXES
// =============================================================================

/// Default namespace grouping the graph's indexes.
pub const DEFAULT_INDEX_NAMESPACE: &str = "docgraph";

pub const INDEX_ALL_VERTICES: &str = "all_vertices";
pub const INDEX_ALL_EDGES: &str = "all_edges";
pub const INDEX_ALL_EDGE_LABELS: &str = "all_edge_labels";
pub const INDEX_VERTEX_PROPS: &str = "vertex_props";
pub const INDEX_EDGE_PROPS: &str = "edge_props";

/// Attempts made before an index query gives up with an empty result.
pub const INDEX_QUERY_RETRIES: u32 = 5;

/// Pause between two index query attempts, in milliseconds.
pub const INDEX_RETRY_DELAY_MS: u64 = 1000;

//! # Core Type Definitions
//!
//! This module contains the shared types of the document-backed graph:
//! - Traversal direction (`Direction`, `Side`, `Endpoint`)
//! - Strongly-typed documents (`VertexDocument`, `EdgeDocument`, `AdjacencyLists`)
//! - Error types (`GraphError`, `StoreError`)
//!
//! ## Document Shapes
//!
//! Documents are typed everywhere inside the crate. They are converted to the
//! store's generic JSON representation only when crossing the `DocumentStore`
//! boundary.

use crate::config::ConfigError;
use crate::primitives::{EDGE_TYPE, VERTEX_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Property name -> value mapping shared by vertices and edges.
///
/// `BTreeMap` keeps the serialized documents in a stable key order.
pub type Properties = BTreeMap<String, serde_json::Value>;

/// Label -> ordered edge keys.
pub type LabeledRefs = BTreeMap<String, Vec<String>>;

// =============================================================================
// DIRECTION
// =============================================================================

/// Direction of a traversal relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Edges leaving the vertex.
    Out,
    /// Edges arriving at the vertex.
    In,
    /// Both of the above.
    Both,
}

impl Direction {
    /// The adjacency sides covered by this direction.
    #[must_use]
    pub const fn sides(self) -> &'static [Side] {
        match self {
            Self::Out => &[Side::Out],
            Self::In => &[Side::In],
            Self::Both => &[Side::In, Side::Out],
        }
    }

    /// Decide which vertex sits on the far side of an edge.
    ///
    /// `own_key` is the key of the vertex the traversal starts from, `from`
    /// and `to` are the edge's endpoint keys. For `Both`, a self-loop resolves
    /// to the starting vertex once; an edge touching neither endpoint resolves
    /// to `None`.
    #[must_use]
    pub fn far_end<'a>(self, own_key: &str, from: &'a str, to: &'a str) -> Option<Endpoint<'a>> {
        let pick = |key: &'a str| {
            if key == own_key {
                Endpoint::This
            } else {
                Endpoint::Other(key)
            }
        };

        match self {
            Self::Out => Some(pick(to)),
            Self::In => Some(pick(from)),
            Self::Both => {
                if from == own_key && to == own_key {
                    Some(Endpoint::This)
                } else if to == own_key {
                    Some(Endpoint::Other(from))
                } else if from == own_key {
                    Some(Endpoint::Other(to))
                } else {
                    None
                }
            }
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Out => "out",
            Self::In => "in",
            Self::Both => "both",
        };
        f.write_str(name)
    }
}

impl FromStr for Direction {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "out" => Ok(Self::Out),
            "in" => Ok(Self::In),
            "both" => Ok(Self::Both),
            other => Err(GraphError::InvalidArgument(format!(
                "unknown direction '{other}', expected out, in or both"
            ))),
        }
    }
}

/// One concrete side of a vertex's adjacency lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    In,
    Out,
}

/// Result of resolving the far end of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// The traversal's own vertex (self-loop).
    This,
    /// Another vertex, by document key.
    Other(&'a str),
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// The constant `type` tag carried by every graph document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "vertex")]
    Vertex,
    #[serde(rename = "edge")]
    Edge,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str(VERTEX_TYPE),
            Self::Edge => f.write_str(EDGE_TYPE),
        }
    }
}

/// Incoming and outgoing edge keys of a vertex, grouped by label.
///
/// ```text
/// { "in":  { "label1": ["e_..."] },
///   "out": { "label2": ["e_...", "e_..."] } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyLists {
    #[serde(rename = "in", default)]
    pub incoming: LabeledRefs,
    #[serde(rename = "out", default)]
    pub outgoing: LabeledRefs,
}

impl AdjacencyLists {
    /// Create empty adjacency lists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow one side.
    #[must_use]
    pub fn side(&self, side: Side) -> &LabeledRefs {
        match side {
            Side::In => &self.incoming,
            Side::Out => &self.outgoing,
        }
    }

    /// Mutably borrow one side.
    pub fn side_mut(&mut self, side: Side) -> &mut LabeledRefs {
        match side {
            Side::In => &mut self.incoming,
            Side::Out => &mut self.outgoing,
        }
    }

    /// Edge keys stored under `label` on `side`.
    #[must_use]
    pub fn refs(&self, side: Side, label: &str) -> &[String] {
        self.side(side).get(label).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every edge key on both sides, each key reported once.
    #[must_use]
    pub fn all_refs(&self) -> Vec<String> {
        let mut seen = std::collections::BTreeSet::new();
        self.incoming
            .values()
            .chain(self.outgoing.values())
            .flatten()
            .filter(|key| seen.insert(key.as_str()))
            .cloned()
            .collect()
    }

    /// True when neither side holds any label.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty() && self.outgoing.is_empty()
    }
}

/// The `edges` field as it is persisted.
///
/// Inline lists are stored as a JSON object; both compressed modes store a
/// string (base64 payload or the key of a side binary document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncodedAdjacency {
    Inline(AdjacencyLists),
    Packed(String),
}

/// Shared behavior of the two persisted document kinds.
pub trait StoredDocument: Serialize + serde::de::DeserializeOwned + Clone {
    /// The tag every document of this kind must carry.
    const KIND: DocumentKind;

    /// The tag actually present on this document.
    fn kind(&self) -> DocumentKind;

    fn props(&self) -> &Properties;

    fn props_mut(&mut self) -> &mut Properties;
}

/// A vertex as stored under `v_<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexDocument {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(default)]
    pub props: Properties,
    pub edges: EncodedAdjacency,
}

impl VertexDocument {
    /// A vertex without properties carrying the given encoded adjacency.
    #[must_use]
    pub fn new(edges: EncodedAdjacency) -> Self {
        Self {
            kind: DocumentKind::Vertex,
            props: Properties::new(),
            edges,
        }
    }
}

impl StoredDocument for VertexDocument {
    const KIND: DocumentKind = DocumentKind::Vertex;

    fn kind(&self) -> DocumentKind {
        self.kind
    }

    fn props(&self) -> &Properties {
        &self.props
    }

    fn props_mut(&mut self) -> &mut Properties {
        &mut self.props
    }
}

/// An edge as stored under `e_<from>->|<label>|-><to>`.
///
/// `from` and `to` hold vertex document keys, not raw ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDocument {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub props: Properties,
}

impl EdgeDocument {
    #[must_use]
    pub fn new(from: impl Into<String>, label: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            kind: DocumentKind::Edge,
            from: from.into(),
            to: to.into(),
            label: label.into(),
            props: Properties::new(),
        }
    }
}

impl StoredDocument for EdgeDocument {
    const KIND: DocumentKind = DocumentKind::Edge;

    fn kind(&self) -> DocumentKind {
        self.kind
    }

    fn props(&self) -> &Properties {
        &self.props
    }

    fn props_mut(&mut self) -> &mut Properties {
        &mut self.props
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Failures reported by a `DocumentStore` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No document is stored under the key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// Insert refused because the key is taken.
    #[error("key already exists: {0}")]
    AlreadyExists(String),

    /// The named index is not defined (or not yet queryable).
    #[error("index not ready: {0}")]
    IndexNotReady(String),

    /// A stored payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other backend failure (I/O, transaction, lock).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors that can occur in the graph layer.
///
/// `DocNotFound` is the one the facade turns into an absent result; the
/// others propagate to the caller.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The requested document is absent or could not be fetched.
    #[error("document not found: {key} ({source})")]
    DocNotFound {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The vertex id counter could not be incremented.
    #[error("could not generate a vertex id: {0}")]
    IdGeneration(#[source] StoreError),

    /// Adjacency lists could not be compressed.
    #[error("could not compress adjacency lists: {0}")]
    Compression(String),

    /// Adjacency lists could not be decompressed or decoded.
    #[error("could not decompress adjacency lists: {0}")]
    Decompression(String),

    /// The backing store could not be opened.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// A caller passed a malformed direction, key or name.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A typed document could not be built from its stored form.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A store call failed for a reason other than a missing document.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Settings could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GraphError {
    /// Wrap a store failure that happened while fetching `key`.
    #[must_use]
    pub fn not_found(key: impl Into<String>, source: StoreError) -> Self {
        Self::DocNotFound {
            key: key.into(),
            source,
        }
    }

    /// True for every flavour of "the document is not there".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DocNotFound { .. } | Self::Store(StoreError::NotFound(_))
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

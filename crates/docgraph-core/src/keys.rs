//! # Key Codec
//!
//! Builds and parses the document keys of vertices, edges and external
//! adjacency documents. Pure string work, no I/O.
//!
//! Labels and vertex ids are not escaped. A label containing `|` or `->`
//! produces a key whose structural parts cannot be recovered unambiguously;
//! `parse_edge_key` then still returns the id but may report other parts.

use crate::primitives::{ADJACENCY_PREFIX, EDGE_ARROW, EDGE_PREFIX, LABEL_DELIMITER, VERTEX_PREFIX};
use crate::types::GraphError;

/// Key of the vertex document for `id`.
#[must_use]
pub fn vertex_key(id: &str) -> String {
    format!("{VERTEX_PREFIX}{id}")
}

/// Strip the vertex prefix from a key.
pub fn parse_vertex_id(key: &str) -> Result<&str, GraphError> {
    key.strip_prefix(VERTEX_PREFIX).ok_or_else(|| {
        GraphError::InvalidArgument(format!("'{key}' is not a vertex key"))
    })
}

/// Structural edge id: `<from>->|<label>|-><to>`.
#[must_use]
pub fn edge_id(from_id: &str, label: &str, to_id: &str) -> String {
    format!("{from_id}{EDGE_ARROW}{LABEL_DELIMITER}{label}{LABEL_DELIMITER}{EDGE_ARROW}{to_id}")
}

/// Structural edge key: `e_<from>->|<label>|-><to>`.
#[must_use]
pub fn edge_key(from_id: &str, label: &str, to_id: &str) -> String {
    edge_key_from_id(&edge_id(from_id, label, to_id))
}

/// Edge key for an explicitly chosen edge id.
#[must_use]
pub fn edge_key_from_id(id: &str) -> String {
    format!("{EDGE_PREFIX}{id}")
}

/// Key of the side binary document holding a vertex's adjacency lists.
#[must_use]
pub fn adjacency_key(vertex_id: &str) -> String {
    format!("{ADJACENCY_PREFIX}{vertex_id}")
}

/// Pieces recovered from an edge key.
///
/// `from`, `label` and `to` are present only when the id has the structural
/// shape; edges created with an explicit id carry just `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeKeyParts {
    pub id: String,
    pub from: Option<String>,
    pub label: Option<String>,
    pub to: Option<String>,
}

/// Split an edge key into its parts.
///
/// `from` ends at the first `->`, `to` starts after the last `->`, and the
/// label lies between the first and the last `|`.
pub fn parse_edge_key(key: &str) -> Result<EdgeKeyParts, GraphError> {
    let id = key
        .strip_prefix(EDGE_PREFIX)
        .ok_or_else(|| GraphError::InvalidArgument(format!("'{key}' is not an edge key")))?;

    let mut parts = EdgeKeyParts {
        id: id.to_string(),
        from: None,
        label: None,
        to: None,
    };

    let open = format!("{EDGE_ARROW}{LABEL_DELIMITER}");
    let close = format!("{LABEL_DELIMITER}{EDGE_ARROW}");
    if !(id.contains(&open) && id.contains(&close)) {
        return Ok(parts);
    }

    let (Some(from_end), Some(to_arrow), Some(label_open), Some(label_close)) = (
        id.find(EDGE_ARROW),
        id.rfind(EDGE_ARROW),
        id.find(LABEL_DELIMITER),
        id.rfind(LABEL_DELIMITER),
    ) else {
        return Ok(parts);
    };

    let label_start = label_open + LABEL_DELIMITER.len();
    if label_start > label_close {
        return Ok(parts);
    }

    parts.from = id.get(..from_end).map(str::to_string);
    parts.to = id.get(to_arrow + EDGE_ARROW.len()..).map(str::to_string);
    parts.label = id.get(label_start..label_close).map(str::to_string);
    Ok(parts)
}

//! # CLI Command Implementations
//!
//! Each command runs against an opened `DocGraph` and returns a JSON report;
//! printing is left to the caller.

use super::{Listing, Target};
use docgraph_core::{Direction, DocGraph, Edge, Element, GraphError, Settings, Vertex};
use serde_json::{Value, json};
use tracing::debug;

/// Open the graph described by `settings`.
pub fn open_graph(settings: &Settings) -> Result<DocGraph, GraphError> {
    debug!(backend = ?settings.store.backend, path = ?settings.store.path, "opening graph");
    DocGraph::open(settings)
}

fn require_vertex(graph: &DocGraph, id: &str) -> Result<Vertex, GraphError> {
    graph
        .get_vertex(id)?
        .ok_or_else(|| GraphError::InvalidArgument(format!("vertex '{id}' does not exist")))
}

fn require_edge(graph: &DocGraph, id: &str) -> Result<Edge, GraphError> {
    graph
        .get_edge(id)?
        .ok_or_else(|| GraphError::InvalidArgument(format!("edge '{id}' does not exist")))
}

/// Either element behind a `Target`.
enum Selected {
    Vertex(Vertex),
    Edge(Edge),
}

impl Selected {
    fn resolve(graph: &DocGraph, target: &Target) -> Result<Self, GraphError> {
        match (&target.vertex, &target.edge) {
            (Some(id), _) => require_vertex(graph, id).map(Self::Vertex),
            (None, Some(id)) => require_edge(graph, id).map(Self::Edge),
            (None, None) => Err(GraphError::InvalidArgument(
                "either --vertex or --edge is required".to_string(),
            )),
        }
    }

    fn element(&mut self) -> &mut dyn Element {
        match self {
            Self::Vertex(v) => v,
            Self::Edge(e) => e,
        }
    }

    fn to_document(&mut self) -> Result<Value, GraphError> {
        match self {
            Self::Vertex(v) => v.to_document(),
            Self::Edge(e) => e.to_document(),
        }
    }
}

fn vertex_ids(vertices: &[Vertex]) -> Vec<&str> {
    vertices.iter().map(|v| v.id()).collect()
}

fn edge_summary(edge: &mut Edge) -> Result<Value, GraphError> {
    let (from, to) = edge.endpoint_keys()?;
    Ok(json!({
        "id": edge.id(),
        "label": edge.label()?,
        "from": from,
        "to": to,
    }))
}

fn edge_summaries(edges: Vec<Edge>) -> Result<Vec<Value>, GraphError> {
    edges.into_iter().map(|mut e| edge_summary(&mut e)).collect()
}

fn label_refs(labels: &[String]) -> Vec<&str> {
    labels.iter().map(String::as_str).collect()
}

// =============================================================================
// GRAPH COMMANDS
// =============================================================================

/// Report the store and what the graph supports.
pub fn cmd_init(graph: &DocGraph) -> Result<Value, GraphError> {
    let features = graph.features();
    Ok(json!({
        "initialized": true,
        "persistent": features.is_persistent,
        "refresh": format!("{:?}", graph.refresh_policy()).to_lowercase(),
        "self_loops": features.supports_self_loops,
        "duplicate_edges": features.supports_duplicate_edges,
    }))
}

/// Count vertices, edges and labels.
pub fn cmd_status(graph: &DocGraph) -> Result<Value, GraphError> {
    Ok(json!({
        "vertices": graph.vertices()?.len(),
        "edges": graph.edges()?.len(),
        "labels": graph.edge_labels()?,
    }))
}

// =============================================================================
// ELEMENT COMMANDS
// =============================================================================

pub fn cmd_add_vertex(graph: &DocGraph, id: Option<&str>) -> Result<Value, GraphError> {
    let vertex = graph.add_vertex(id)?;
    Ok(json!({ "vertex": vertex.id(), "key": vertex.key() }))
}

pub fn cmd_add_edge(
    graph: &DocGraph,
    from: &str,
    to: &str,
    label: &str,
    id: Option<&str>,
) -> Result<Value, GraphError> {
    let mut source = require_vertex(graph, from)?;
    let mut target = require_vertex(graph, to)?;
    let edge = graph
        .add_edge(id, &mut source, &mut target, label)?
        .ok_or_else(|| GraphError::InvalidArgument(format!("'{from}' or '{to}' vanished")))?;
    Ok(json!({ "edge": edge.id(), "key": edge.key() }))
}

pub fn cmd_set_prop(
    graph: &DocGraph,
    target: &Target,
    key: &str,
    value: Value,
) -> Result<Value, GraphError> {
    let mut selected = Selected::resolve(graph, target)?;
    let element = selected.element();
    element.set_property(key, value.clone())?;
    Ok(json!({ "key": element.key(), "property": key, "value": value }))
}

pub fn cmd_unset_prop(graph: &DocGraph, target: &Target, key: &str) -> Result<Value, GraphError> {
    let mut selected = Selected::resolve(graph, target)?;
    let element = selected.element();
    let previous = element.remove_property(key)?;
    Ok(json!({ "key": element.key(), "property": key, "removed": previous }))
}

pub fn cmd_show(graph: &DocGraph, target: &Target) -> Result<Value, GraphError> {
    Selected::resolve(graph, target)?.to_document()
}

pub fn cmd_remove_vertex(graph: &DocGraph, id: &str) -> Result<Value, GraphError> {
    let mut vertex = require_vertex(graph, id)?;
    graph.remove_vertex(&mut vertex)?;
    Ok(json!({ "removed": vertex.key() }))
}

pub fn cmd_remove_edge(graph: &DocGraph, id: &str) -> Result<Value, GraphError> {
    let mut edge = require_edge(graph, id)?;
    graph.remove_edge(&mut edge)?;
    Ok(json!({ "removed": edge.key() }))
}

// =============================================================================
// TRAVERSAL AND LOOKUP COMMANDS
// =============================================================================

pub fn cmd_neighbors(
    graph: &DocGraph,
    id: &str,
    direction: Direction,
    labels: &[String],
) -> Result<Value, GraphError> {
    let mut vertex = require_vertex(graph, id)?;
    let neighbors = vertex.vertices(direction, &label_refs(labels))?;
    Ok(json!({
        "vertex": id,
        "direction": direction.to_string(),
        "neighbors": vertex_ids(&neighbors),
    }))
}

pub fn cmd_edges(
    graph: &DocGraph,
    id: &str,
    direction: Direction,
    labels: &[String],
) -> Result<Value, GraphError> {
    let mut vertex = require_vertex(graph, id)?;
    let edges = vertex.edges(direction, &label_refs(labels))?;
    Ok(json!({
        "vertex": id,
        "direction": direction.to_string(),
        "edges": edge_summaries(edges)?,
    }))
}

pub fn cmd_list(graph: &DocGraph, what: Listing) -> Result<Value, GraphError> {
    Ok(match what {
        Listing::Vertices => json!(vertex_ids(&graph.vertices()?)),
        Listing::Edges => json!(edge_summaries(graph.edges()?)?),
        Listing::Labels => json!(graph.edge_labels()?),
    })
}

pub fn cmd_find(graph: &DocGraph, key: &str, value: &Value, edges: bool) -> Result<Value, GraphError> {
    if edges {
        Ok(json!(edge_summaries(graph.edges_by_property(key, value)?)?))
    } else {
        Ok(json!(vertex_ids(&graph.vertices_by_property(key, value)?)))
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

/// Render a report for the terminal: pretty JSON, or `key: value` lines.
pub fn render(report: &Value, json_mode: bool) -> String {
    if json_mode {
        return serde_json::to_string_pretty(report).unwrap_or_default();
    }
    match report {
        Value::Object(fields) => fields
            .iter()
            .map(|(k, v)| format!("{k}: {}", render_scalar(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Array(items) => items
            .iter()
            .map(render_scalar)
            .collect::<Vec<_>>()
            .join("\n"),
        other => render_scalar(other),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn render_text_object() {
        let text = render(&json!({"vertex": "a", "count": 2}), false);
        assert_eq!(text, "count: 2\nvertex: a");
    }

    #[test]
    fn render_text_list() {
        assert_eq!(render(&json!(["a", "b"]), false), "a\nb");
    }

    #[test]
    fn render_json() {
        let text = render(&json!({"a": 1}), true);
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, json!({"a": 1}));
    }
}

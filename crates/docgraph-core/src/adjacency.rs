//! # Adjacency Codec
//!
//! Maintains a vertex's label-grouped edge key lists and converts them to and
//! from the stored `edges` field through the configured compression strategy.
//!
//! Mutations only touch the in-memory lists; persisting them is the caller's
//! job (see `Vertex`).

use crate::compression::{CompressionMode, CompressionStrategy};
use crate::types::{AdjacencyLists, Direction, EncodedAdjacency, GraphError};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Encoder/decoder for adjacency lists, bound to one compression strategy.
#[derive(Clone)]
pub struct AdjacencyCodec {
    strategy: Arc<dyn CompressionStrategy>,
}

impl AdjacencyCodec {
    #[must_use]
    pub fn new(strategy: Arc<dyn CompressionStrategy>) -> Self {
        Self { strategy }
    }

    #[must_use]
    pub fn mode(&self) -> CompressionMode {
        self.strategy.mode()
    }

    /// Encode lists into the stored `edges` form.
    pub fn encode(
        &self,
        vertex_id: &str,
        lists: &AdjacencyLists,
    ) -> Result<EncodedAdjacency, GraphError> {
        self.strategy.pack(vertex_id, lists)
    }

    /// The `edges` form for a vertex document not yet inserted. Writes
    /// nothing outside that document.
    pub fn reserve(
        &self,
        vertex_id: &str,
        lists: &AdjacencyLists,
    ) -> Result<EncodedAdjacency, GraphError> {
        self.strategy.reserve(vertex_id, lists)
    }

    /// True if encoded lists live in a side document.
    #[must_use]
    pub fn stores_outside(&self) -> bool {
        self.strategy.stores_outside()
    }

    /// Decode the stored `edges` form.
    pub fn decode(
        &self,
        vertex_id: &str,
        encoded: &EncodedAdjacency,
    ) -> Result<AdjacencyLists, GraphError> {
        self.strategy.unpack(vertex_id, encoded)
    }

    /// Drop storage kept outside the vertex document, if any.
    pub fn discard(&self, vertex_id: &str) -> Result<(), GraphError> {
        self.strategy.discard(vertex_id)
    }

    /// Append `edge_key` under `label` on every side `direction` covers.
    ///
    /// Missing labels are created. `Both` records a self-loop on both sides.
    pub fn add_ref(lists: &mut AdjacencyLists, label: &str, edge_key: &str, direction: Direction) {
        for side in direction.sides() {
            lists
                .side_mut(*side)
                .entry(label.to_string())
                .or_default()
                .push(edge_key.to_string());
        }
    }

    /// Remove the first occurrence of `edge_key` under `label` on every side
    /// `direction` covers. A label left without keys is dropped.
    ///
    /// Returns true if anything was removed.
    pub fn remove_ref(
        lists: &mut AdjacencyLists,
        label: &str,
        edge_key: &str,
        direction: Direction,
    ) -> bool {
        let mut removed = false;
        for side in direction.sides() {
            let refs = lists.side_mut(*side);
            let Some(keys) = refs.get_mut(label) else {
                continue;
            };
            if let Some(pos) = keys.iter().position(|k| k == edge_key) {
                keys.remove(pos);
                removed = true;
            }
            if keys.is_empty() {
                refs.remove(label);
            }
        }
        removed
    }

    /// Labels present on the sides `direction` covers.
    #[must_use]
    pub fn labels(lists: &AdjacencyLists, direction: Direction) -> BTreeSet<String> {
        direction
            .sides()
            .iter()
            .flat_map(|side| lists.side(*side).keys().cloned())
            .collect()
    }

    /// Edge keys for `labels` on the sides `direction` covers, in list order,
    /// each key reported once.
    #[must_use]
    pub fn refs_for<S: AsRef<str>>(
        lists: &AdjacencyLists,
        direction: Direction,
        labels: &[S],
    ) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut keys = Vec::new();
        for label in labels {
            for side in direction.sides() {
                for key in lists.refs(*side, label.as_ref()) {
                    if seen.insert(key.as_str()) {
                        keys.push(key.clone());
                    }
                }
            }
        }
        keys
    }
}

impl fmt::Debug for AdjacencyCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdjacencyCodec")
            .field("strategy", &self.strategy)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compression::{InlineGzip, Uncompressed};
    use crate::types::Side;

    #[test]
    fn add_creates_label_and_appends() {
        let mut lists = AdjacencyLists::new();
        AdjacencyCodec::add_ref(&mut lists, "knows", "e_1", Direction::Out);
        AdjacencyCodec::add_ref(&mut lists, "knows", "e_2", Direction::Out);
        assert_eq!(lists.refs(Side::Out, "knows"), ["e_1", "e_2"]);
        assert!(lists.incoming.is_empty());
    }

    #[test]
    fn both_records_self_loop_on_each_side() {
        let mut lists = AdjacencyLists::new();
        AdjacencyCodec::add_ref(&mut lists, "self", "e_a->|self|->a", Direction::Both);
        assert_eq!(lists.refs(Side::Out, "self").len(), 1);
        assert_eq!(lists.refs(Side::In, "self").len(), 1);
    }

    #[test]
    fn remove_drops_first_occurrence_and_empty_label() {
        let mut lists = AdjacencyLists::new();
        AdjacencyCodec::add_ref(&mut lists, "l", "e_x", Direction::Out);
        AdjacencyCodec::add_ref(&mut lists, "l", "e_x", Direction::Out);

        assert!(AdjacencyCodec::remove_ref(&mut lists, "l", "e_x", Direction::Out));
        assert_eq!(lists.refs(Side::Out, "l"), ["e_x"]);

        assert!(AdjacencyCodec::remove_ref(&mut lists, "l", "e_x", Direction::Out));
        assert!(!lists.outgoing.contains_key("l"));
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut lists = AdjacencyLists::new();
        assert!(!AdjacencyCodec::remove_ref(&mut lists, "l", "e_x", Direction::Both));
        assert!(lists.is_empty());
    }

    #[test]
    fn refs_for_dedupes_self_loops() {
        let mut lists = AdjacencyLists::new();
        AdjacencyCodec::add_ref(&mut lists, "l", "e_loop", Direction::Both);
        AdjacencyCodec::add_ref(&mut lists, "l", "e_out", Direction::Out);
        let keys = AdjacencyCodec::refs_for(&lists, Direction::Both, &["l"]);
        assert_eq!(keys, vec!["e_loop".to_string(), "e_out".to_string()]);
    }

    #[test]
    fn labels_per_direction() {
        let mut lists = AdjacencyLists::new();
        AdjacencyCodec::add_ref(&mut lists, "a", "e_1", Direction::Out);
        AdjacencyCodec::add_ref(&mut lists, "b", "e_2", Direction::In);
        assert_eq!(AdjacencyCodec::labels(&lists, Direction::Out).len(), 1);
        assert_eq!(AdjacencyCodec::labels(&lists, Direction::Both).len(), 2);
    }

    #[test]
    fn codec_round_trips_through_strategy() {
        let mut lists = AdjacencyLists::new();
        AdjacencyCodec::add_ref(&mut lists, "l", "e_1", Direction::In);

        for codec in [
            AdjacencyCodec::new(Arc::new(Uncompressed)),
            AdjacencyCodec::new(Arc::new(InlineGzip)),
        ] {
            let encoded = codec.encode("v", &lists).unwrap();
            assert_eq!(codec.decode("v", &encoded).unwrap(), lists);
        }
    }
}

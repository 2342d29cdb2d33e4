//! # Adjacency Compression
//!
//! Gzip helpers and the three storage strategies for a vertex's adjacency
//! lists:
//!
//! | Mode       | `edges` field holds                          |
//! |------------|----------------------------------------------|
//! | `none`     | the lists as a JSON object                   |
//! | `inline`   | base64 of the gzip of the lists' JSON text   |
//! | `external` | the key `al_<id>` of a binary side document  |
//!
//! The strategy is chosen once when the graph is opened and is never
//! branched on per call.

use crate::keys;
use crate::store::DocumentStore;
use crate::types::{AdjacencyLists, EncodedAdjacency, GraphError, StoreError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

// =============================================================================
// GZIP / BASE64
// =============================================================================

/// Gzip the UTF-8 bytes of `text`.
pub fn gzip(text: &str) -> Result<Vec<u8>, GraphError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(|e| GraphError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| GraphError::Compression(e.to_string()))
}

/// Inflate gzip bytes back into text.
pub fn gunzip(bytes: &[u8]) -> Result<String, GraphError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| GraphError::Decompression(e.to_string()))?;
    Ok(text)
}

#[must_use]
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn from_base64(text: &str) -> Result<Vec<u8>, GraphError> {
    STANDARD
        .decode(text)
        .map_err(|e| GraphError::Decompression(format!("invalid base64 payload: {e}")))
}

fn lists_to_json(lists: &AdjacencyLists) -> Result<String, GraphError> {
    serde_json::to_string(lists).map_err(|e| GraphError::Compression(e.to_string()))
}

fn lists_from_json(text: &str) -> Result<AdjacencyLists, GraphError> {
    serde_json::from_str(text).map_err(|e| GraphError::Decompression(e.to_string()))
}

// =============================================================================
// STRATEGY
// =============================================================================

/// Configured adjacency storage mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    #[default]
    None,
    Inline,
    External,
}

impl CompressionMode {
    /// Build the strategy for this mode. `External` writes side documents
    /// through `store`.
    #[must_use]
    pub fn strategy(self, store: &Arc<dyn DocumentStore>) -> Arc<dyn CompressionStrategy> {
        match self {
            Self::None => Arc::new(Uncompressed),
            Self::Inline => Arc::new(InlineGzip),
            Self::External => Arc::new(ExternalGzip::new(Arc::clone(store))),
        }
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Inline => f.write_str("inline"),
            Self::External => f.write_str("external"),
        }
    }
}

/// Converts between decoded adjacency lists and the stored `edges` field.
pub trait CompressionStrategy: Send + Sync + fmt::Debug {
    fn mode(&self) -> CompressionMode;

    /// Encode `lists` for the vertex `vertex_id`.
    fn pack(&self, vertex_id: &str, lists: &AdjacencyLists)
    -> Result<EncodedAdjacency, GraphError>;

    /// Decode a stored `edges` field.
    fn unpack(&self, vertex_id: &str, encoded: &EncodedAdjacency)
    -> Result<AdjacencyLists, GraphError>;

    /// The `edges` field of a vertex document that is about to be inserted.
    ///
    /// Must not write outside the vertex document; whatever `pack` stores
    /// elsewhere is written by `pack` once the insert has succeeded.
    fn reserve(&self, vertex_id: &str, lists: &AdjacencyLists)
    -> Result<EncodedAdjacency, GraphError> {
        self.pack(vertex_id, lists)
    }

    /// True if `pack` keeps the lists outside the vertex document.
    fn stores_outside(&self) -> bool {
        false
    }

    /// Drop whatever the strategy stored outside the vertex document.
    fn discard(&self, _vertex_id: &str) -> Result<(), GraphError> {
        Ok(())
    }
}

/// Lists stored as a plain JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uncompressed;

impl CompressionStrategy for Uncompressed {
    fn mode(&self) -> CompressionMode {
        CompressionMode::None
    }

    fn pack(&self, _vertex_id: &str, lists: &AdjacencyLists) -> Result<EncodedAdjacency, GraphError> {
        Ok(EncodedAdjacency::Inline(lists.clone()))
    }

    fn unpack(
        &self,
        vertex_id: &str,
        encoded: &EncodedAdjacency,
    ) -> Result<AdjacencyLists, GraphError> {
        match encoded {
            EncodedAdjacency::Inline(lists) => Ok(lists.clone()),
            EncodedAdjacency::Packed(_) => Err(GraphError::Decompression(format!(
                "vertex {vertex_id} holds packed adjacency lists but compression is disabled"
            ))),
        }
    }
}

/// Lists gzipped and embedded as base64 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineGzip;

impl CompressionStrategy for InlineGzip {
    fn mode(&self) -> CompressionMode {
        CompressionMode::Inline
    }

    fn pack(&self, _vertex_id: &str, lists: &AdjacencyLists) -> Result<EncodedAdjacency, GraphError> {
        let packed = gzip(&lists_to_json(lists)?)?;
        Ok(EncodedAdjacency::Packed(to_base64(&packed)))
    }

    fn unpack(
        &self,
        vertex_id: &str,
        encoded: &EncodedAdjacency,
    ) -> Result<AdjacencyLists, GraphError> {
        match encoded {
            EncodedAdjacency::Packed(text) => lists_from_json(&gunzip(&from_base64(text)?)?),
            EncodedAdjacency::Inline(_) => Err(GraphError::Decompression(format!(
                "vertex {vertex_id} holds plain adjacency lists but inline compression is enabled"
            ))),
        }
    }
}

/// Lists gzipped into a binary side document `al_<id>`.
pub struct ExternalGzip {
    store: Arc<dyn DocumentStore>,
}

impl ExternalGzip {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

impl fmt::Debug for ExternalGzip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalGzip")
            .field("store", &self.store.name())
            .finish()
    }
}

impl CompressionStrategy for ExternalGzip {
    fn mode(&self) -> CompressionMode {
        CompressionMode::External
    }

    fn pack(&self, vertex_id: &str, lists: &AdjacencyLists) -> Result<EncodedAdjacency, GraphError> {
        let packed = gzip(&lists_to_json(lists)?)?;
        let key = keys::adjacency_key(vertex_id);
        self.store
            .upsert_binary(&key, &packed)
            .map_err(|e| GraphError::Compression(format!("{key}: {e}")))?;
        Ok(EncodedAdjacency::Packed(key))
    }

    fn reserve(&self, vertex_id: &str, _lists: &AdjacencyLists) -> Result<EncodedAdjacency, GraphError> {
        Ok(EncodedAdjacency::Packed(keys::adjacency_key(vertex_id)))
    }

    fn stores_outside(&self) -> bool {
        true
    }

    fn unpack(
        &self,
        vertex_id: &str,
        encoded: &EncodedAdjacency,
    ) -> Result<AdjacencyLists, GraphError> {
        let EncodedAdjacency::Packed(key) = encoded else {
            return Err(GraphError::Decompression(format!(
                "vertex {vertex_id} holds plain adjacency lists but external compression is enabled"
            )));
        };
        let packed = self.store.get_binary(key).map_err(|e| match e {
            StoreError::NotFound(_) => GraphError::not_found(key.clone(), e),
            other => GraphError::Store(other),
        })?;
        lists_from_json(&gunzip(&packed)?)
    }

    fn discard(&self, vertex_id: &str) -> Result<(), GraphError> {
        match self.store.remove_binary(&keys::adjacency_key(vertex_id)) {
            Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sample() -> AdjacencyLists {
        let mut lists = AdjacencyLists::new();
        lists
            .outgoing
            .insert("friend of".into(), vec!["e_tuc->|friend of|->2_tuc".into()]);
        lists
    }

    #[test]
    fn gzip_round_trip() {
        let text = "{\"in\":{},\"out\":{}} ünïcödé";
        assert_eq!(gunzip(&gzip(text).unwrap()).unwrap(), text);
    }

    #[test]
    fn gunzip_rejects_garbage() {
        assert!(matches!(
            gunzip(b"not gzip"),
            Err(GraphError::Decompression(_))
        ));
    }

    #[test]
    fn bad_base64_is_a_decompression_error() {
        let err = InlineGzip
            .unpack("x", &EncodedAdjacency::Packed("***".into()))
            .unwrap_err();
        assert!(matches!(err, GraphError::Decompression(_)));
    }

    #[test]
    fn inline_packs_to_string() {
        let encoded = InlineGzip.pack("tuc", &sample()).unwrap();
        assert!(matches!(encoded, EncodedAdjacency::Packed(_)));
        assert_eq!(InlineGzip.unpack("tuc", &encoded).unwrap(), sample());
    }

    #[test]
    fn external_writes_side_document() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let strategy = CompressionMode::External.strategy(&store);

        let encoded = strategy.pack("tc", &sample()).unwrap();
        assert_eq!(encoded, EncodedAdjacency::Packed("al_tc".into()));
        assert!(store.get_binary("al_tc").is_ok());
        assert_eq!(strategy.unpack("tc", &encoded).unwrap(), sample());

        strategy.discard("tc").unwrap();
        assert!(store.get_binary("al_tc").is_err());
        strategy.discard("tc").unwrap();
    }

    #[test]
    fn external_reserve_writes_nothing() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        store.upsert_binary("al_tc", &gzip("{}").unwrap()).unwrap();
        let strategy = CompressionMode::External.strategy(&store);
        assert!(strategy.stores_outside());

        let encoded = strategy.reserve("tc", &sample()).unwrap();
        assert_eq!(encoded, EncodedAdjacency::Packed("al_tc".into()));
        assert_eq!(gunzip(&store.get_binary("al_tc").unwrap()).unwrap(), "{}");
    }

    #[test]
    fn external_missing_side_document_is_not_found() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let err = ExternalGzip::new(store)
            .unpack("gone", &EncodedAdjacency::Packed("al_gone".into()))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn uncompressed_rejects_packed_form() {
        assert!(
            Uncompressed
                .unpack("x", &EncodedAdjacency::Packed("abc".into()))
                .is_err()
        );
    }
}

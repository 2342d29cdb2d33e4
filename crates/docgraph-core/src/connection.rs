//! # Store Connection
//!
//! Opens the configured `DocumentStore`. The handle is created once at
//! startup and passed explicitly to the graph; nothing here is global.

use crate::config::{StoreBackend, StoreSettings};
use crate::store::{DocumentStore, MemoryStore, RedbStore};
use crate::types::GraphError;
use std::sync::Arc;
use tracing::info;

/// Open the store described by `settings`.
pub fn connect(settings: &StoreSettings) -> Result<Arc<dyn DocumentStore>, GraphError> {
    match settings.backend {
        StoreBackend::Memory => {
            info!(backend = "memory", "opening document store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redb => {
            let path = settings.path.as_ref().ok_or_else(|| {
                GraphError::ConnectionFailure("the redb backend needs a store path".to_string())
            })?;
            info!(backend = "redb", path = %path.display(), "opening document store");
            let store = RedbStore::open(path)
                .map_err(|e| GraphError::ConnectionFailure(format!("{}: {e}", path.display())))?;
            Ok(Arc::new(store))
        }
    }
}

//! The last-resolved-slug marker.
//!
//! On each resolution the orchestrator compares the marker with the slug it
//! is about to load; when they differ, the previous tenant's entry is
//! evicted so a later return to it refetches.

use std::sync::Arc;

use vitrine_core::{Slug, StorageError};

use crate::key::CURRENT_TENANT_SLUG_KEY;
use crate::kv::KeyValueStore;

/// Reads and writes the `current_tenant_slug` key.
#[derive(Clone)]
pub struct ResolutionMarker {
    store: Arc<dyn KeyValueStore>,
}

impl ResolutionMarker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The slug last written, if any.
    ///
    /// A marker that no longer decodes or no longer parses as a slug is
    /// removed and reported as absent.
    pub fn get(&self) -> Result<Option<Slug>, StorageError> {
        let Some(raw) = self.store.get(CURRENT_TENANT_SLUG_KEY)? else {
            return Ok(None);
        };

        let parsed = serde_json::from_str::<String>(&raw)
            .ok()
            .and_then(|s| Slug::parse(&s).ok());

        if parsed.is_none() {
            tracing::warn!(raw = %raw, "Discarding unreadable tenant marker");
            self.store.remove(CURRENT_TENANT_SLUG_KEY)?;
        }
        Ok(parsed)
    }

    pub fn set(&self, slug: &Slug) -> Result<(), StorageError> {
        let raw = serde_json::to_string(slug.as_str()).map_err(|e| {
            StorageError::Serialization {
                key: CURRENT_TENANT_SLUG_KEY.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.store.set(CURRENT_TENANT_SLUG_KEY, &raw)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(CURRENT_TENANT_SLUG_KEY).map(|_| ())
    }
}

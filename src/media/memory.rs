//! In-memory object store for development and tests

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::media::{ObjectStore, ObjectStoreError};

/// Keeps objects in a process-local map and hands back `memory://`
/// URLs. Optionally fails puts whose key contains a marker substring,
/// which lets tests exercise the all-or-nothing upload policy.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    fail_marker: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every put whose key contains `marker` fail.
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().expect("object store lock poisoned").len()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, ObjectStoreError> {
        if let Some(marker) = &self.fail_marker {
            if key.contains(marker) {
                return Err(ObjectStoreError::new(format!(
                    "simulated failure for key '{}'",
                    key
                )));
            }
        }

        self.objects
            .write()
            .map_err(|_| ObjectStoreError::new("object store lock poisoned"))?
            .insert(
                key.to_string(),
                StoredObject {
                    content_type: content_type.to_string(),
                    data: body,
                },
            );

        Ok(format!("memory://media/{}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_stores_object_and_returns_url() {
        let store = MemoryObjectStore::new();
        let url = store
            .put("properties/abc-front.jpg", "image/jpeg", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(url, "memory://media/properties/abc-front.jpg");
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_marker_rejects_matching_keys() {
        let store = MemoryObjectStore::new().failing_on("broken");
        assert!(store
            .put("properties/x-broken.jpg", "image/jpeg", vec![])
            .await
            .is_err());
        assert!(store
            .put("properties/x-fine.jpg", "image/jpeg", vec![])
            .await
            .is_ok());
    }
}

//! Photo persistence to durable object storage
//!
//! Uploads are all-or-nothing per listing: each asset is uploaded
//! independently (concurrently, bounded), each with its own retry
//! budget, and any asset exhausting that budget fails the whole batch.
//! A listing is never linked to a partial photo set.
//!
//! The storage backend sits behind the [`ObjectStore`] trait; the S3
//! implementation lives in [`s3`], with an in-memory implementation in
//! [`memory`] for development and tests.

pub mod memory;
pub mod s3;

use futures::stream::{self, StreamExt, TryStreamExt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::IngestError;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

/// Failure of a single object-store call.
#[derive(Debug)]
pub struct ObjectStoreError {
    pub message: String,
}

impl ObjectStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ObjectStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ObjectStoreError {}

/// Durable binary storage yielding stable retrieval URLs.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist one object and return its retrieval URL.
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, ObjectStoreError>;
}

/// One photo as received from the creation endpoint.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Uploads photo batches, preserving input order in the returned URLs.
#[derive(Clone)]
pub struct MediaUploader {
    store: Arc<dyn ObjectStore>,
    /// Upper bound on simultaneous in-flight uploads.
    max_in_flight: usize,
    /// Additional attempts per asset after the first.
    retry_attempts: u32,
}

impl MediaUploader {
    pub fn new(store: Arc<dyn ObjectStore>, max_in_flight: usize, retry_attempts: u32) -> Self {
        Self {
            store,
            max_in_flight: max_in_flight.max(1),
            retry_attempts,
        }
    }

    /// Upload every photo; the returned URLs line up index-for-index
    /// with the input so listing photo order matches upload order.
    ///
    /// Fails with `MediaUploadFailed` as soon as any asset exhausts its
    /// retry budget; remaining in-flight uploads are dropped.
    pub async fn upload_all(&self, photos: Vec<PhotoUpload>) -> Result<Vec<String>, IngestError> {
        stream::iter(photos.into_iter().map(|photo| self.upload_one(photo)))
            .buffered(self.max_in_flight)
            .try_collect()
            .await
    }

    async fn upload_one(&self, photo: PhotoUpload) -> Result<String, IngestError> {
        let key = format!("properties/{}-{}", Uuid::new_v4(), photo.file_name);
        let mut last_error = String::new();

        for attempt in 0..=self.retry_attempts {
            match self
                .store
                .put(&key, &photo.content_type, photo.data.clone())
                .await
            {
                Ok(url) => {
                    debug!(key = %key, attempt, "photo uploaded");
                    return Ok(url);
                }
                Err(err) => {
                    warn!(key = %key, attempt, error = %err, "photo upload attempt failed");
                    last_error = err.message;
                }
            }
        }

        Err(IngestError::MediaUploadFailed {
            file_name: photo.file_name,
            message: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn photo(name: &str) -> PhotoUpload {
        PhotoUpload {
            file_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8],
        }
    }

    /// Fails the first `failures` calls for every key, then succeeds.
    struct FlakyStore {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ObjectStore for FlakyStore {
        async fn put(
            &self,
            key: &str,
            _content_type: &str,
            _body: Vec<u8>,
        ) -> Result<String, ObjectStoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ObjectStoreError::new("transient failure"))
            } else {
                Ok(format!("https://cdn.test/{}", key))
            }
        }
    }

    #[tokio::test]
    async fn test_urls_preserve_upload_order() {
        let store = Arc::new(MemoryObjectStore::new());
        let uploader = MediaUploader::new(store, 4, 0);

        let urls = uploader
            .upload_all(vec![photo("a.jpg"), photo("b.jpg"), photo("c.jpg")])
            .await
            .unwrap();

        assert_eq!(urls.len(), 3);
        assert!(urls[0].contains("a.jpg"));
        assert!(urls[1].contains("b.jpg"));
        assert!(urls[2].contains("c.jpg"));
    }

    #[tokio::test]
    async fn test_empty_batch_yields_empty_urls() {
        let uploader = MediaUploader::new(Arc::new(MemoryObjectStore::new()), 4, 0);
        let urls = uploader.upload_all(vec![]).await.unwrap();
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let store = Arc::new(FlakyStore {
            failures: 1,
            calls: AtomicUsize::new(0),
        });
        let uploader = MediaUploader::new(store, 1, 2);

        let urls = uploader.upload_all(vec![photo("a.jpg")]).await.unwrap();
        assert_eq!(urls.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retry_budget_fails_whole_batch() {
        let store = Arc::new(MemoryObjectStore::new().failing_on("bad"));
        let uploader = MediaUploader::new(store, 2, 1);

        let err = uploader
            .upload_all(vec![photo("good.jpg"), photo("bad.jpg")])
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::MediaUploadFailed { .. }));
    }

    #[tokio::test]
    async fn test_keys_are_unique_per_upload() {
        let store = Arc::new(MemoryObjectStore::new());
        let uploader = MediaUploader::new(store.clone(), 2, 0);

        uploader
            .upload_all(vec![photo("same.jpg"), photo("same.jpg")])
            .await
            .unwrap();

        assert_eq!(store.object_count(), 2);
    }
}

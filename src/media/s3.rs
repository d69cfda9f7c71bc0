//! S3 object store backend

use aws_sdk_s3::primitives::ByteStream;

use crate::media::{ObjectStore, ObjectStoreError};

/// Object store backed by an S3 bucket.
///
/// The inner client is pooled and safe for concurrent use; one instance
/// is shared across all requests.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, region: String) -> Self {
        Self {
            client,
            bucket,
            region,
        }
    }

    /// Build a store from the ambient AWS environment (credentials
    /// chain, region) and the configured bucket.
    pub async fn from_env(bucket: String, region: String) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_s3::Client::new(&sdk_config), bucket, region)
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, ObjectStoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| ObjectStoreError::new(e.to_string()))?;

        Ok(self.object_url(key))
    }
}

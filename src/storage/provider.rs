use async_trait::async_trait;
use bytes::Bytes;

use crate::types::StorageResult;

/// A connected client for one bucket. Keys passed in are already resolved.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn get_object(&self, key: &str) -> StorageResult<Bytes>;

    /// Returns the version id assigned by the service, if it reports one.
    async fn put_object(&self, key: &str, body: &[u8]) -> StorageResult<Option<String>>;

    async fn delete_object(&self, key: &str) -> StorageResult<()>;
}

/// Builds an [`ObjectClient`] bound to a bucket and a credential profile.
#[async_trait]
pub trait ClientConnector: Send + Sync {
    type Client: ObjectClient;

    async fn connect(&self, bucket: &str, profile: &str) -> StorageResult<Self::Client>;
}

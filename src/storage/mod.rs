// Storage layer (S3-compatible)

use async_trait::async_trait;
use bytes::Bytes;

use crate::context::RequestContext;
use crate::types::StorageResult;

pub mod bucket;
pub mod key;
pub mod memory;
pub mod provider;
pub mod s3_client;

pub use bucket::ObjectStore;
pub use key::resolve_key;
pub use memory::{MemoryClient, MemoryConnector};
pub use provider::{ClientConnector, ObjectClient};
pub use s3_client::{S3Connector, S3ObjectClient};

/// The capability set callers depend on: three verbs over a bucket.
///
/// `folder` is an optional logical prefix; pass `""` for the bucket root.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fetch the whole object into memory.
    async fn download(
        &self,
        ctx: &RequestContext,
        filename: &str,
        folder: &str,
    ) -> StorageResult<Bytes>;

    /// Write `bytes` as the object body, replacing any existing object.
    async fn upload(
        &self,
        ctx: &RequestContext,
        filename: &str,
        folder: &str,
        bytes: &[u8],
    ) -> StorageResult<()>;

    /// Remove the object. Missing objects are not an error.
    async fn delete(&self, ctx: &RequestContext, filename: &str, folder: &str)
        -> StorageResult<()>;
}

// Bucket-bound object store
// ObjectStore binds a bucket name to a credential profile and exposes the
// ObjectStorage verbs over keys built from (folder, filename). The client is
// created on first use and then reused for the lifetime of the store.
// Concurrent first calls wait on a single connect. A failed connect leaves
// the store uninitialized, so the next call tries again.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{error, info, info_span, warn, Instrument, Span};

use super::key::resolve_key;
use super::provider::{ClientConnector, ObjectClient};
use super::s3_client::S3Connector;
use super::ObjectStorage;
use crate::config::StorageConfig;
use crate::context::RequestContext;
use crate::types::{StorageError, StorageResult};

pub struct ObjectStore<C: ClientConnector = S3Connector> {
    bucket: String,
    profile: String,
    connector: C,
    client: OnceCell<C::Client>,
    span: Span,
    request_timeout: Option<Duration>,
}

impl ObjectStore<S3Connector> {
    /// S3-backed store resolving credentials for `profile` from the environment
    pub fn new(bucket: impl Into<String>, profile: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let profile = profile.into();
        let connector = S3Connector::new(StorageConfig::for_bucket(bucket.clone(), profile.clone()));
        Self::with_connector(bucket, profile, connector)
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::with_connector(
            config.bucket.clone(),
            config.profile.clone(),
            S3Connector::new(config.clone()),
        )
        .with_request_timeout(config.request_timeout())
    }
}

impl<C: ClientConnector> ObjectStore<C> {
    pub fn with_connector(
        bucket: impl Into<String>,
        profile: impl Into<String>,
        connector: C,
    ) -> Self {
        let bucket = bucket.into();
        let profile = profile.into();
        let span = info_span!("object_store", bucket = %bucket, profile = %profile);

        Self {
            bucket,
            profile,
            connector,
            client: OnceCell::new(),
            span,
            request_timeout: None,
        }
    }

    /// Log under the caller's span instead of the store's own
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Upper bound applied to every call on top of the caller's context
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Whether the client has been initialized
    pub fn is_ready(&self) -> bool {
        self.client.initialized()
    }

    fn bounded(&self, ctx: &RequestContext) -> RequestContext {
        match self.request_timeout {
            Some(timeout) => ctx.clone().timeout(timeout),
            None => ctx.clone(),
        }
    }

    async fn client(&self, ctx: &RequestContext) -> StorageResult<&C::Client> {
        self.client
            .get_or_try_init(|| async move {
                info!(
                    "Configuring bucket {} with profile {}",
                    self.bucket, self.profile
                );
                ctx.run("connect", self.connector.connect(&self.bucket, &self.profile))
                    .await
                    .map_err(|e| {
                        error!("Failed to configure bucket {}: {}", self.bucket, e);
                        e
                    })
            })
            .await
    }

    /// Only a key that resolves to nothing at all is refused
    fn object_key(filename: &str, folder: &str) -> StorageResult<String> {
        let key = resolve_key(folder, filename);
        if key.is_empty() {
            error!("Rejected empty object key (folder: {:?})", folder);
            return Err(StorageError::InvalidInput(
                "object key must not be empty".to_string(),
            ));
        }
        Ok(key)
    }

    fn log_failure(operation: &str, key: &str, err: StorageError) -> StorageError {
        match &err {
            StorageError::NotFound(_) => warn!("{} {}: {}", operation, key, err),
            _ => error!("{} {} failed: {}", operation, key, err),
        }
        err
    }

    async fn download_object(
        &self,
        ctx: &RequestContext,
        filename: &str,
        folder: &str,
    ) -> StorageResult<Bytes> {
        let key = Self::object_key(filename, folder)?;
        let ctx = self.bounded(ctx);
        let client = self.client(&ctx).await?;

        info!("Getting file: {}", key);
        let body = ctx
            .run(&format!("download {}", key), client.get_object(&key))
            .await
            .map_err(|e| Self::log_failure("download", &key, e))?;

        info!("File downloaded successfully: {} ({} bytes)", key, body.len());
        Ok(body)
    }

    async fn upload_object(
        &self,
        ctx: &RequestContext,
        filename: &str,
        folder: &str,
        bytes: &[u8],
    ) -> StorageResult<()> {
        let key = Self::object_key(filename, folder)?;
        let ctx = self.bounded(ctx);
        let client = self.client(&ctx).await?;

        info!("Uploading file: {} ({} bytes)", key, bytes.len());
        let version = ctx
            .run(&format!("upload {}", key), client.put_object(&key, bytes))
            .await
            .map_err(|e| Self::log_failure("upload", &key, e))?;

        match version {
            Some(version) => info!("File uploaded: {} (version {})", key, version),
            None => info!("File uploaded: {} (unversioned)", key),
        }
        Ok(())
    }

    async fn delete_object(
        &self,
        ctx: &RequestContext,
        filename: &str,
        folder: &str,
    ) -> StorageResult<()> {
        let key = Self::object_key(filename, folder)?;
        let ctx = self.bounded(ctx);
        let client = self.client(&ctx).await?;

        ctx.run(&format!("delete {}", key), client.delete_object(&key))
            .await
            .map_err(|e| Self::log_failure("delete", &key, e))?;

        info!("File deleted: {}", key);
        Ok(())
    }
}

#[async_trait]
impl<C: ClientConnector> ObjectStorage for ObjectStore<C> {
    async fn download(
        &self,
        ctx: &RequestContext,
        filename: &str,
        folder: &str,
    ) -> StorageResult<Bytes> {
        self.download_object(ctx, filename, folder)
            .instrument(self.span.clone())
            .await
    }

    async fn upload(
        &self,
        ctx: &RequestContext,
        filename: &str,
        folder: &str,
        bytes: &[u8],
    ) -> StorageResult<()> {
        self.upload_object(ctx, filename, folder, bytes)
            .instrument(self.span.clone())
            .await
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        filename: &str,
        folder: &str,
    ) -> StorageResult<()> {
        self.delete_object(ctx, filename, folder)
            .instrument(self.span.clone())
            .await
    }
}

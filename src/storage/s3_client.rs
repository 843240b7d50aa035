// S3 client backed by rust-s3
// Works against AWS S3 or any S3-compatible service (MinIO, DigitalOcean
// Spaces, etc.) when an endpoint is configured.

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::request::ResponseData;
use s3::{Bucket, Region};
use tracing::debug;

use super::provider::{ClientConnector, ObjectClient};
use crate::config::StorageConfig;
use crate::types::{StorageError, StorageResult};

const VERSION_ID_HEADER: &str = "x-amz-version-id";

/// Builds [`S3ObjectClient`]s from storage settings
#[derive(Debug, Clone)]
pub struct S3Connector {
    config: StorageConfig,
}

impl S3Connector {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn region(&self) -> StorageResult<Region> {
        match &self.config.endpoint {
            Some(endpoint) => Ok(Region::Custom {
                region: self.config.region.clone(),
                endpoint: endpoint.clone(),
            }),
            None => self.config.region.parse::<Region>().map_err(|e| {
                StorageError::InvalidInput(format!("region '{}': {}", self.config.region, e))
            }),
        }
    }

    /// Resolve credentials on the blocking pool; the profile chain may read
    /// files or query instance metadata.
    async fn credentials(&self, profile: &str) -> StorageResult<Credentials> {
        let static_keys = self
            .config
            .static_credentials()
            .map(|(key, secret)| (key.to_string(), secret.to_string()));
        let profile_name = profile.to_string();

        let resolved = tokio::task::spawn_blocking(move || match static_keys {
            Some((key, secret)) => Credentials::new(Some(&key), Some(&secret), None, None, None),
            None => Credentials::new(None, None, None, None, Some(&profile_name)),
        })
        .await
        .map_err(|e| StorageError::TransientIo(format!("credential resolution aborted: {}", e)))?;

        resolved.map_err(|e| StorageError::Auth(format!("profile '{}': {}", profile, e)))
    }
}

#[async_trait]
impl ClientConnector for S3Connector {
    type Client = S3ObjectClient;

    async fn connect(&self, bucket_name: &str, profile: &str) -> StorageResult<S3ObjectClient> {
        let credentials = self.credentials(profile).await?;
        let region = self.region()?;

        let mut bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| map_s3_error(bucket_name, e))?;
        if self.config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(S3ObjectClient { bucket })
    }
}

/// Object operations against one S3 bucket
pub struct S3ObjectClient {
    bucket: Bucket,
}

impl S3ObjectClient {
    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }
}

#[async_trait]
impl ObjectClient for S3ObjectClient {
    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| map_s3_error(key, e))?;
        check_status(key, &response)?;

        debug!("GetObject {} returned {} bytes", key, response.bytes().len());
        Ok(response.bytes().clone())
    }

    async fn put_object(&self, key: &str, body: &[u8]) -> StorageResult<Option<String>> {
        let response = self
            .bucket
            .put_object(key, body)
            .await
            .map_err(|e| map_s3_error(key, e))?;
        check_status(key, &response)?;

        Ok(response.headers().get(VERSION_ID_HEADER).cloned())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let outcome = match self.bucket.delete_object(key).await {
            Ok(response) => check_status(key, &response),
            Err(e) => Err(map_s3_error(key, e)),
        };

        match outcome {
            Err(StorageError::NotFound(_)) => {
                debug!("DeleteObject {} reported missing object", key);
                Ok(())
            }
            other => other,
        }
    }
}

fn check_status(key: &str, response: &ResponseData) -> StorageResult<()> {
    let status = response.status_code();
    if (200..300).contains(&status) {
        return Ok(());
    }
    let body = String::from_utf8_lossy(response.bytes()).into_owned();
    Err(map_status(key, status, body))
}

fn map_status(key: &str, status: u16, body: String) -> StorageError {
    match status {
        404 => StorageError::NotFound(key.to_string()),
        401 | 403 => StorageError::Auth(format!("{} rejected with {}: {}", key, status, body)),
        _ => StorageError::TransientIo(format!("{} failed with {}: {}", key, status, body)),
    }
}

fn map_s3_error(key: &str, err: S3Error) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(status, body) => map_status(key, status, body),
        S3Error::Credentials(e) => StorageError::Auth(e.to_string()),
        other => StorageError::TransientIo(format!("{}: {}", key, other)),
    }
}

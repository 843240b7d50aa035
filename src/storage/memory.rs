// In-memory object storage
// A process-local stand-in for an S3 bucket. Every client built by one
// MemoryConnector shares the same object map, so objects written through one
// store are visible through another. The connector counts connect attempts.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::provider::{ClientConnector, ObjectClient};
use crate::types::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct MemoryState {
    /// Objects keyed by (bucket, key)
    objects: RwLock<HashMap<(String, String), Bytes>>,
    connects: AtomicUsize,
    failing_connects: AtomicUsize,
    next_version: AtomicU64,
}

/// Connector that hands out clients over a shared in-memory map
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every connect and every object call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next `count` connects fail with an authentication error
    pub fn fail_next_connects(&self, count: usize) {
        self.state.failing_connects.store(count, Ordering::SeqCst);
    }

    /// Number of connect attempts, successful or not
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub async fn object_count(&self) -> usize {
        self.state.objects.read().await.len()
    }

    async fn simulate_latency(latency: Option<Duration>) {
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ClientConnector for MemoryConnector {
    type Client = MemoryClient;

    async fn connect(&self, bucket: &str, profile: &str) -> StorageResult<MemoryClient> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Self::simulate_latency(self.latency).await;

        let remaining_failures = self.state.failing_connects.load(Ordering::SeqCst);
        if remaining_failures > 0 {
            self.state
                .failing_connects
                .store(remaining_failures - 1, Ordering::SeqCst);
            return Err(StorageError::Auth(format!(
                "profile '{}' could not be resolved",
                profile
            )));
        }

        debug!("Memory client connected for bucket {}", bucket);
        Ok(MemoryClient {
            bucket: bucket.to_string(),
            state: Arc::clone(&self.state),
            latency: self.latency,
        })
    }
}

/// Client view of one bucket inside a [`MemoryConnector`]
#[derive(Debug, Clone)]
pub struct MemoryClient {
    bucket: String,
    state: Arc<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryClient {
    fn entry(&self, key: &str) -> (String, String) {
        (self.bucket.clone(), key.to_string())
    }
}

#[async_trait]
impl ObjectClient for MemoryClient {
    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        MemoryConnector::simulate_latency(self.latency).await;
        self.state
            .objects
            .read()
            .await
            .get(&self.entry(key))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", self.bucket, key)))
    }

    async fn put_object(&self, key: &str, body: &[u8]) -> StorageResult<Option<String>> {
        MemoryConnector::simulate_latency(self.latency).await;
        let version = self.state.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .objects
            .write()
            .await
            .insert(self.entry(key), Bytes::copy_from_slice(body));
        Ok(Some(format!("v{}", version)))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        MemoryConnector::simulate_latency(self.latency).await;
        self.state.objects.write().await.remove(&self.entry(key));
        Ok(())
    }
}

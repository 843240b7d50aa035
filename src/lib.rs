// Bucket Store - thin S3 bucket client over folder-prefixed keys

pub mod config;
pub mod context;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use context::RequestContext;
pub use storage::{ObjectStorage, ObjectStore};
pub use types::{StorageError, StorageResult};

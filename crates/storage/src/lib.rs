//! Object storage abstraction and backends for zipseed.
//!
//! This crate provides:
//! - The `ObjectStore` and `MultipartSink` traits the archive pipeline
//!   writes through
//! - Backends: S3-compatible (multipart upload) and local filesystem
//!   (development and tests)

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use traits::{MultipartSink, ObjectMeta, ObjectStore, PartBuffer};

use std::sync::Arc;
use zipseed_core::config::{SinkConfig, StorageConfig};

/// Create an object store from configuration.
pub async fn from_config(
    config: &StorageConfig,
    sink: &SinkConfig,
) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;
    sink.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
        } => {
            let backend = S3Backend::new(
                bucket,
                endpoint.clone(),
                region.clone(),
                prefix.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
                *force_path_style,
                sink.min_part_size,
            )
            .await?;
            Ok(Arc::new(backend))
        }
    }
}

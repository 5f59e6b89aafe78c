#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod error;
pub use error::StorageError;

/// Point cloud store on the local filesystem.
pub mod file;
pub use file::FilePointCloudStorage;

use async_trait::async_trait;
use lidarkit_3d::pointcloud::PointCloud;

/// A keyed store of point clouds.
///
/// Identifiers are non-empty file stem safe strings. Callers writing the same
/// identifier concurrently must order those writes themselves.
#[async_trait]
pub trait PointCloudStorage: Send + Sync {
    /// Store `cloud` under `id`, replacing any previous entry.
    async fn save(&self, cloud: &PointCloud, id: &str) -> Result<(), StorageError>;

    /// Load the cloud stored under `id`.
    async fn load(&self, id: &str) -> Result<PointCloud, StorageError>;

    /// Remove the entry for `id`. Removing a missing entry succeeds.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Identifiers of all stored clouds, sorted.
    async fn list(&self) -> Result<Vec<String>, StorageError>;
}

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use glam::Mat4;
use lidarkit_3d::io::ply::{decode_ply, encode_ply, PlyFormat};
use lidarkit_3d::pointcloud::{Metadata, MetadataValue, PointCloud};
use serde::{Deserialize, Serialize};

use crate::{PointCloudStorage, StorageError};

/// Extension of the JSON sidecar holding everything PLY cannot.
pub const METADATA_EXTENSION: &str = "metadata";

/// Extension of the point data file.
pub const PLY_EXTENSION: &str = "ply";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMetadata {
    timestamp: SystemTime,
    point_count: usize,
    metadata: Metadata,
    transform: [[f32; 4]; 4],
}

/// Stores each cloud as `<id>.ply` (binary PLY) plus `<id>.metadata` (JSON)
/// in a single directory.
///
/// The directory is created on the first save.
///
/// # Example
///
/// ```no_run
/// use lidarkit_3d::pointcloud::PointCloud;
/// use lidarkit_storage::{FilePointCloudStorage, PointCloudStorage};
///
/// # async fn run() -> Result<(), lidarkit_storage::StorageError> {
/// let storage = FilePointCloudStorage::new("/tmp/pointclouds");
/// storage.save(&PointCloud::from_points(vec![]), "scan-1").await?;
/// assert_eq!(storage.list().await?, vec!["scan-1".to_string()]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FilePointCloudStorage {
    root: PathBuf,
}

impl FilePointCloudStorage {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory holding the stored files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{id}.{extension}"))
    }
}

fn validate_id(id: &str) -> Result<(), StorageError> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(StorageError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

/// JSON has no representation for NaN or infinity, so such values would not
/// load back.
fn validate_finite(cloud: &PointCloud, id: &str) -> Result<(), StorageError> {
    for (key, value) in cloud.metadata() {
        if let MetadataValue::Float(v) = value {
            if !v.is_finite() {
                return Err(StorageError::InvalidData(format!(
                    "metadata {key} of {id} is not finite: {v}"
                )));
            }
        }
    }
    if !cloud.transform().is_finite() {
        return Err(StorageError::InvalidData(format!(
            "transform of {id} is not finite"
        )));
    }
    Ok(())
}

async fn read_stored(path: &Path, id: &str) -> Result<Vec<u8>, StorageError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => StorageError::FileNotFound(id.to_string()),
        _ => e.into(),
    })
}

async fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[async_trait]
impl PointCloudStorage for FilePointCloudStorage {
    async fn save(&self, cloud: &PointCloud, id: &str) -> Result<(), StorageError> {
        validate_id(id)?;
        validate_finite(cloud, id)?;

        let stored = StoredMetadata {
            timestamp: cloud.timestamp(),
            point_count: cloud.len(),
            metadata: cloud.metadata().clone(),
            transform: cloud.transform().to_cols_array_2d(),
        };
        let json = serde_json::to_vec_pretty(&stored)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        let ply = encode_ply(cloud, PlyFormat::BinaryLittleEndian)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;

        // list keys on the sidecar, so it goes last
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(id, PLY_EXTENSION), ply).await?;
        tokio::fs::write(self.path_for(id, METADATA_EXTENSION), json).await?;

        log::debug!(
            "Saved point cloud {id} with {} points to {}",
            cloud.len(),
            self.root.display()
        );
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<PointCloud, StorageError> {
        validate_id(id)?;

        let json = read_stored(&self.path_for(id, METADATA_EXTENSION), id).await?;
        let ply = read_stored(&self.path_for(id, PLY_EXTENSION), id).await?;

        let stored: StoredMetadata = serde_json::from_slice(&json)
            .map_err(|e| StorageError::InvalidData(format!("metadata of {id}: {e}")))?;
        let points = decode_ply(&ply)
            .map_err(|e| StorageError::InvalidData(format!("points of {id}: {e}")))?
            .into_points();

        if points.len() != stored.point_count {
            return Err(StorageError::InvalidData(format!(
                "{id} holds {} points but its metadata records {}",
                points.len(),
                stored.point_count
            )));
        }

        Ok(PointCloud::new(
            points,
            stored.timestamp,
            stored.metadata,
            Mat4::from_cols_array_2d(&stored.transform),
        ))
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        validate_id(id)?;
        remove_if_exists(&self.path_for(id, METADATA_EXTENSION)).await?;
        remove_if_exists(&self.path_for(id, PLY_EXTENSION)).await?;
        log::debug!("Deleted point cloud {id}");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(METADATA_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use lidarkit_3d::pointcloud::{Point, METADATA_CAPTURE_DEVICE, METADATA_FRAME_NUMBER};
    use std::time::Duration;

    fn sample_cloud() -> PointCloud {
        let mut metadata = Metadata::new();
        metadata.insert(METADATA_CAPTURE_DEVICE.to_string(), "LiDAR".into());
        metadata.insert(METADATA_FRAME_NUMBER.to_string(), 1234.5.into());

        PointCloud::new(
            vec![
                Point::new(Vec3::new(0.5, 1.0, -2.0), 0.5).with_color([1, 2, 3, 255]),
                Point::new(Vec3::new(-1.0, 0.0, -1.0), 1.0).with_normal(Vec3::Y),
            ],
            SystemTime::UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789),
            metadata,
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
        )
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let storage = FilePointCloudStorage::new(tmp_dir.path().join("clouds"));
        let cloud = sample_cloud();

        storage.save(&cloud, "scan").await?;
        assert!(storage.root().join("scan.ply").exists());
        assert!(storage.root().join("scan.metadata").exists());

        let loaded = storage.load("scan").await?;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.timestamp(), cloud.timestamp());
        assert_eq!(loaded.metadata(), cloud.metadata());
        assert_eq!(loaded.transform(), cloud.transform());
        assert_eq!(loaded.points()[0].position, cloud.points()[0].position);
        assert_eq!(loaded.points()[0].color, Some([1, 2, 3, 255]));
        assert_eq!(loaded.points()[1].normal, Some(Vec3::Y));
        Ok(())
    }

    #[tokio::test]
    async fn test_metadata_layout() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let storage = FilePointCloudStorage::new(tmp_dir.path());
        storage.save(&sample_cloud(), "scan").await?;

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(tmp_dir.path().join("scan.metadata"))?)?;
        assert_eq!(json["pointCount"], 2);
        assert_eq!(json["metadata"]["captureDevice"], "LiDAR");
        assert_eq!(json["transform"][3][0], 1.0);
        assert!(json.get("timestamp").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_identifiers() {
        let tmp_dir = tempfile::tempdir().expect("tempdir");
        let storage = FilePointCloudStorage::new(tmp_dir.path());
        let cloud = sample_cloud();

        for id in ["", ".", "..", "a/b", "a\\b"] {
            assert!(matches!(
                storage.save(&cloud, id).await,
                Err(StorageError::InvalidIdentifier(_))
            ));
            assert!(matches!(
                storage.load(id).await,
                Err(StorageError::InvalidIdentifier(_))
            ));
            assert!(matches!(
                storage.delete(id).await,
                Err(StorageError::InvalidIdentifier(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_load_missing() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let storage = FilePointCloudStorage::new(tmp_dir.path());
        assert!(matches!(
            storage.load("missing").await,
            Err(StorageError::FileNotFound(id)) if id == "missing"
        ));

        // metadata without points
        storage.save(&sample_cloud(), "partial").await?;
        std::fs::remove_file(tmp_dir.path().join("partial.ply"))?;
        assert!(matches!(
            storage.load("partial").await,
            Err(StorageError::FileNotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_corrupt() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let storage = FilePointCloudStorage::new(tmp_dir.path());

        storage.save(&sample_cloud(), "bad-json").await?;
        std::fs::write(tmp_dir.path().join("bad-json.metadata"), b"{not json")?;
        assert!(matches!(
            storage.load("bad-json").await,
            Err(StorageError::InvalidData(_))
        ));

        storage.save(&sample_cloud(), "bad-ply").await?;
        std::fs::write(tmp_dir.path().join("bad-ply.ply"), b"not a ply file")?;
        assert!(matches!(
            storage.load("bad-ply").await,
            Err(StorageError::InvalidData(_))
        ));

        storage.save(&sample_cloud(), "mismatch").await?;
        let ply = encode_ply(
            &PointCloud::from_points(vec![Point::new(Vec3::ONE, 1.0)]),
            PlyFormat::BinaryLittleEndian,
        )?;
        std::fs::write(tmp_dir.path().join("mismatch.ply"), ply)?;
        assert!(matches!(
            storage.load("mismatch").await,
            Err(StorageError::InvalidData(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_and_list() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let storage = FilePointCloudStorage::new(tmp_dir.path().join("store"));

        // nothing saved yet, the directory does not exist
        assert!(storage.list().await?.is_empty());
        storage.delete("never-saved").await?;

        for id in ["b", "c", "a"] {
            storage.save(&sample_cloud(), id).await?;
        }
        std::fs::write(storage.root().join("notes.txt"), b"ignored")?;
        assert_eq!(storage.list().await?, vec!["a", "b", "c"]);

        storage.delete("b").await?;
        storage.delete("b").await?;
        assert_eq!(storage.list().await?, vec!["a", "c"]);
        assert!(matches!(
            storage.load("b").await,
            Err(StorageError::FileNotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_save_overwrites() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let storage = FilePointCloudStorage::new(tmp_dir.path());

        storage.save(&sample_cloud(), "scan").await?;
        storage
            .save(&PointCloud::from_points(vec![]), "scan")
            .await?;
        assert!(storage.load("scan").await?.is_empty());
        assert_eq!(storage.list().await?, vec!["scan"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_rejects_non_finite() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let storage = FilePointCloudStorage::new(tmp_dir.path().join("store"));

        let mut metadata = sample_cloud().metadata().clone();
        metadata.insert(METADATA_FRAME_NUMBER.to_string(), f64::NAN.into());
        let nan_metadata = PointCloud::new(vec![], SystemTime::now(), metadata, Mat4::IDENTITY);
        assert!(matches!(
            storage.save(&nan_metadata, "nan").await,
            Err(StorageError::InvalidData(_))
        ));

        let infinite_transform = PointCloud::new(
            vec![],
            SystemTime::now(),
            Metadata::new(),
            Mat4::from_translation(Vec3::new(f32::INFINITY, 0.0, 0.0)),
        );
        assert!(matches!(
            storage.save(&infinite_transform, "inf").await,
            Err(StorageError::InvalidData(_))
        ));

        // nothing was written
        assert!(storage.list().await?.is_empty());
        assert!(!storage.root().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_point_write_is_not_listed() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let storage = FilePointCloudStorage::new(tmp_dir.path());

        // a directory in the way of the point file makes its write fail
        std::fs::create_dir(tmp_dir.path().join("scan.ply"))?;
        assert!(matches!(
            storage.save(&sample_cloud(), "scan").await,
            Err(StorageError::Io(_))
        ));
        assert!(!tmp_dir.path().join("scan.metadata").exists());
        assert!(storage.list().await?.is_empty());
        Ok(())
    }
}

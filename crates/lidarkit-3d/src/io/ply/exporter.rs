use std::path::{Path, PathBuf};

use super::{encode_ply, PlyError, PlyFormat};
use crate::pointcloud::PointCloud;

/// Error types for point cloud export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// No exporter handles the requested file extension
    #[error("Unsupported export format for {0}")]
    UnsupportedFormat(PathBuf),

    /// Encoding failed
    #[error(transparent)]
    Ply(#[from] PlyError),

    /// Failed to write the exported file
    #[error("Failed to write exported file. {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes point clouds into a file format.
pub trait PointCloudExporter {
    /// Encode the cloud into bytes.
    fn export(&self, cloud: &PointCloud) -> Result<Vec<u8>, ExportError>;

    /// Encode the cloud and write it to `path`.
    fn write(&self, cloud: &PointCloud, path: &Path) -> Result<(), ExportError> {
        let bytes = self.export(cloud)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Exports point clouds as PLY.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlyExporter {
    format: PlyFormat,
}

impl PlyExporter {
    /// Create an exporter writing the given encoding.
    pub fn new(format: PlyFormat) -> Self {
        Self { format }
    }

    /// The encoding this exporter writes.
    pub fn format(&self) -> PlyFormat {
        self.format
    }
}

impl PointCloudExporter for PlyExporter {
    fn export(&self, cloud: &PointCloud) -> Result<Vec<u8>, ExportError> {
        Ok(encode_ply(cloud, self.format)?)
    }
}

/// Pick an exporter from the file extension of `path`.
///
/// Only `.ply` is known, matched case insensitively, and exports binary PLY.
pub fn exporter_for_path(path: impl AsRef<Path>) -> Result<Box<dyn PointCloudExporter>, ExportError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ply") => Ok(Box::new(PlyExporter::default())),
        _ => Err(ExportError::UnsupportedFormat(path.to_path_buf())),
    }
}

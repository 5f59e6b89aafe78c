use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glam::Mat4;

use crate::depth::{reconstruct_points, DepthError, DepthFrame};
use crate::pointcloud::{Metadata, PointCloud, METADATA_CAPTURE_DEVICE, METADATA_FRAME_NUMBER};

/// Name recorded in the metadata of clouds built from captured frames.
pub const CAPTURE_DEVICE_NAME: &str = "LiDAR";

/// Errors raised by depth capture sources.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The device has no depth sensor.
    #[error("Depth capture is not supported on this device")]
    DeviceNotSupported,

    /// The capture session could not be configured.
    #[error("Failed to configure the capture session")]
    SessionConfigurationFailed,

    /// A frame arrived without depth data.
    #[error("No depth data available in the frame")]
    NoDepthDataAvailable,

    /// The frame buffers are inconsistent.
    #[error(transparent)]
    Depth(#[from] DepthError),

    /// Failed to read raw frame data.
    #[error("Failed to read depth data. {0}")]
    Io(#[from] std::io::Error),
}

/// A depth frame delivered by a capture source, with its camera pose.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// The depth and confidence buffers.
    pub depth: DepthFrame,
    /// Camera to world transform at capture time.
    pub camera_transform: Mat4,
    /// Sensor timestamp of the frame in seconds.
    pub frame_timestamp: f64,
}

impl CapturedFrame {
    /// Reconstruct the frame into a point cloud.
    ///
    /// The cloud carries the camera transform and records the capture device
    /// and the frame timestamp in its metadata.
    pub fn into_pointcloud(self) -> PointCloud {
        let points = reconstruct_points(self.depth.view());

        let mut metadata = Metadata::new();
        metadata.insert(
            METADATA_CAPTURE_DEVICE.to_string(),
            CAPTURE_DEVICE_NAME.into(),
        );
        metadata.insert(
            METADATA_FRAME_NUMBER.to_string(),
            self.frame_timestamp.into(),
        );

        PointCloud::new(points, SystemTime::now(), metadata, self.camera_transform)
    }
}

/// A producer of captured depth frames.
///
/// Implemented by whatever owns the sensor session. `Ok(None)` means the source
/// has no more frames; a source may legitimately never yield one.
pub trait DepthFrameSource {
    /// Fetch the next frame.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError>;
}

/// A single frame read from raw dumps on disk.
///
/// The depth file holds `width * height` little endian `f32` values and the
/// optional confidence file holds `width * height` bytes, both row major.
#[derive(Debug, Clone)]
pub struct RawDepthFileSource {
    depth_path: PathBuf,
    confidence_path: Option<PathBuf>,
    width: usize,
    height: usize,
    camera_transform: Mat4,
    frame_timestamp: f64,
    consumed: bool,
}

impl RawDepthFileSource {
    /// Create a source for the given raw depth dump.
    pub fn new(depth_path: impl AsRef<Path>, width: usize, height: usize) -> Self {
        Self {
            depth_path: depth_path.as_ref().to_path_buf(),
            confidence_path: None,
            width,
            height,
            camera_transform: Mat4::IDENTITY,
            frame_timestamp: 0.0,
            consumed: false,
        }
    }

    /// Read confidence values from the given raw dump.
    pub fn with_confidence(mut self, confidence_path: impl AsRef<Path>) -> Self {
        self.confidence_path = Some(confidence_path.as_ref().to_path_buf());
        self
    }

    /// Set the camera transform of the frame.
    pub fn with_camera_transform(mut self, camera_transform: Mat4) -> Self {
        self.camera_transform = camera_transform;
        self
    }

    /// Set the sensor timestamp of the frame.
    pub fn with_frame_timestamp(mut self, frame_timestamp: f64) -> Self {
        self.frame_timestamp = frame_timestamp;
        self
    }

    fn read_frame(&self) -> Result<CapturedFrame, CaptureError> {
        let bytes = std::fs::read(&self.depth_path)?;
        if bytes.is_empty() {
            return Err(CaptureError::NoDepthDataAvailable);
        }

        if bytes.len() % 4 != 0 {
            return Err(DepthError::BufferSizeMismatch {
                name: "depth",
                expected: self.width * self.height,
                actual: bytes.len() / 4,
                width: self.width,
                height: self.height,
            }
            .into());
        }

        let depth = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect::<Vec<_>>();

        let mut frame = DepthFrame::new(self.width, self.height, depth)?;
        if let Some(path) = &self.confidence_path {
            frame = frame.with_confidence(std::fs::read(path)?)?;
        }

        Ok(CapturedFrame {
            depth: frame,
            camera_transform: self.camera_transform,
            frame_timestamp: self.frame_timestamp,
        })
    }
}

impl DepthFrameSource for RawDepthFileSource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        if self.consumed {
            return Ok(None);
        }
        self.consumed = true;
        self.read_frame().map(Some)
    }
}

use std::collections::BTreeMap;
use std::time::SystemTime;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Metadata key holding the name of the capturing device.
pub const METADATA_CAPTURE_DEVICE: &str = "captureDevice";

/// Metadata key holding the sensor frame number (frame timestamp in seconds).
pub const METADATA_FRAME_NUMBER: &str = "frameNumber";

/// A single metadata value attached to a point cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A text value.
    Text(String),
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

/// Capture metadata keyed by name.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A single sample of a point cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Position in meters, camera or world space.
    pub position: Vec3,
    /// Optional unit surface normal.
    pub normal: Option<Vec3>,
    /// Sensor confidence in `[0, 1]`.
    pub confidence: f32,
    /// Optional RGBA color.
    pub color: Option<[u8; 4]>,
    /// Optional return intensity.
    pub intensity: Option<f32>,
}

impl Point {
    /// Create a new point with only a position and a confidence.
    pub fn new(position: Vec3, confidence: f32) -> Self {
        Self {
            position,
            normal: None,
            confidence,
            color: None,
            intensity: None,
        }
    }

    /// Set the surface normal of the point.
    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = Some(normal);
        self
    }

    /// Set the RGBA color of the point.
    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the intensity of the point.
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = Some(intensity);
        self
    }
}

/// Axis aligned bounds of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// The minimum corner.
    pub min: Vec3,
    /// The maximum corner.
    pub max: Vec3,
}

impl BoundingBox {
    /// Compute the bounds of the given points.
    ///
    /// Returns a box collapsed at the origin when `points` is empty.
    pub fn from_points(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
            };
        };

        points.iter().fold(
            Self {
                min: first.position,
                max: first.position,
            },
            |bbox, point| Self {
                min: bbox.min.min(point.position),
                max: bbox.max.max(point.position),
            },
        )
    }

    /// The extent of the box along each axis.
    #[inline]
    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }

    /// The center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Check whether a position lies inside the box, boundaries included.
    pub fn contains(&self, position: Vec3) -> bool {
        position.cmpge(self.min).all() && position.cmple(self.max).all()
    }
}

/// A captured point cloud with its capture time, metadata and pose.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    // The points in capture order.
    points: Vec<Point>,
    // When the cloud was captured.
    timestamp: SystemTime,
    // Free form capture information.
    metadata: Metadata,
    // Pose of the cloud, identity by default.
    transform: Mat4,
}

impl PointCloud {
    /// Create a new point cloud from all its parts.
    pub fn new(
        points: Vec<Point>,
        timestamp: SystemTime,
        metadata: Metadata,
        transform: Mat4,
    ) -> Self {
        Self {
            points,
            timestamp,
            metadata,
            transform,
        }
    }

    /// Create a point cloud captured now, without metadata and with an identity transform.
    pub fn from_points(points: Vec<Point>) -> Self {
        Self::new(points, SystemTime::now(), Metadata::new(), Mat4::IDENTITY)
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consume the point cloud and return its points.
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Get the capture timestamp.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Get as reference the capture metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Get the transform of the point cloud.
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Replace the transform of the point cloud.
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    /// Get the bounding box of the points.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    /// Get the center of the bounding box.
    pub fn center(&self) -> Vec3 {
        self.bounding_box().center()
    }

    /// Return a new point cloud with only the points for which `predicate` holds.
    ///
    /// Timestamp, metadata and transform are carried over unchanged.
    pub fn filtered<F>(&self, mut predicate: F) -> PointCloud
    where
        F: FnMut(&Point) -> bool,
    {
        Self {
            points: self.points.iter().filter(|p| predicate(p)).copied().collect(),
            timestamp: self.timestamp,
            metadata: self.metadata.clone(),
            transform: self.transform,
        }
    }
}

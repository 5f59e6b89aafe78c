#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Occupancy grid and dense/sparse region search.
pub mod density;

/// RANSAC style extraction of dominant planes.
pub mod planes;

/// Aggregate statistics over a point cloud.
pub mod statistics;

/// Plain text rendering of the statistics.
pub mod summary;

pub use planes::{detect_planes, DetectedPlane, PlaneDetectionParams};
pub use statistics::{analyze, analyze_cloud, AnalysisParams, PointCloudStatistics};

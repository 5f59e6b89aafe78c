#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Depth sources producing frames with their camera pose.
pub mod capture;

/// Depth frames and their reconstruction into points.
pub mod depth;

/// I/O utilities for reading and writing point clouds.
pub mod io;

/// Point and point cloud types.
pub mod pointcloud;

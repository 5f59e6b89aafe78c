use glam::Vec3;

use crate::pointcloud::Point;

/// Depth values at or beyond this range, in meters, are treated as invalid.
pub const MAX_VALID_DEPTH: f32 = 20.0;

/// Error types for the depth module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DepthError {
    /// A buffer does not hold one value per pixel.
    #[error("{name} buffer has {actual} values, expected {expected} ({width}x{height})")]
    BufferSizeMismatch {
        /// Which buffer is wrong.
        name: &'static str,
        /// Number of values the buffer should hold, `usize::MAX` when
        /// `width * height` overflows.
        expected: usize,
        /// Number of values the buffer holds.
        actual: usize,
        /// Frame width in pixels.
        width: usize,
        /// Frame height in pixels.
        height: usize,
    },
}

fn check_len(
    name: &'static str,
    actual: usize,
    width: usize,
    height: usize,
) -> Result<(), DepthError> {
    match width.checked_mul(height) {
        Some(expected) if expected == actual => Ok(()),
        expected => Err(DepthError::BufferSizeMismatch {
            name,
            expected: expected.unwrap_or(usize::MAX),
            actual,
            width,
            height,
        }),
    }
}

/// An owned depth frame with an optional per-pixel confidence map.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    width: usize,
    height: usize,
    depth: Vec<f32>,
    confidence: Option<Vec<u8>>,
}

impl DepthFrame {
    /// Create a new depth frame from a row major buffer of depths in meters.
    ///
    /// # Errors
    ///
    /// Returns an error if `depth` does not hold exactly `width * height` values.
    pub fn new(width: usize, height: usize, depth: Vec<f32>) -> Result<Self, DepthError> {
        check_len("depth", depth.len(), width, height)?;
        Ok(Self {
            width,
            height,
            depth,
            confidence: None,
        })
    }

    /// Attach a row major confidence map, one byte per pixel.
    ///
    /// # Errors
    ///
    /// Returns an error if `confidence` does not hold exactly `width * height` values.
    pub fn with_confidence(mut self, confidence: Vec<u8>) -> Result<Self, DepthError> {
        check_len("confidence", confidence.len(), self.width, self.height)?;
        self.confidence = Some(confidence);
        Ok(self)
    }

    /// The width of the frame in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The height of the frame in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Borrow the buffers of the frame for reading.
    pub fn view(&self) -> DepthFrameView<'_> {
        DepthFrameView {
            width: self.width,
            height: self.height,
            depth: &self.depth,
            confidence: self.confidence.as_deref(),
        }
    }
}

/// Read-only access to a depth buffer and its optional confidence buffer.
///
/// The view holds a shared borrow of both buffers, so read access ends when the
/// view is dropped, whatever path the caller takes.
#[derive(Debug, Clone, Copy)]
pub struct DepthFrameView<'a> {
    width: usize,
    height: usize,
    depth: &'a [f32],
    confidence: Option<&'a [u8]>,
}

impl<'a> DepthFrameView<'a> {
    /// Wrap externally owned buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer does not hold exactly `width * height` values.
    pub fn new(
        width: usize,
        height: usize,
        depth: &'a [f32],
        confidence: Option<&'a [u8]>,
    ) -> Result<Self, DepthError> {
        check_len("depth", depth.len(), width, height)?;
        if let Some(confidence) = confidence {
            check_len("confidence", confidence.len(), width, height)?;
        }
        Ok(Self {
            width,
            height,
            depth,
            confidence,
        })
    }

    /// The width of the frame in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The height of the frame in pixels.
    pub fn height(&self) -> usize {
        self.height
    }
}

/// Check whether a depth sample lies in the accepted `(0, 20)` meter range.
#[inline]
pub fn is_valid_depth(depth: f32) -> bool {
    depth > 0.0 && depth < MAX_VALID_DEPTH
}

/// Reproject a pixel with a known depth to camera space.
///
/// The pixel is mapped to normalized device coordinates and scaled by the
/// depth; the camera looks down the negative Z axis.
#[inline]
pub fn unproject_pixel(x: usize, y: usize, width: usize, height: usize, depth: f32) -> Vec3 {
    let nx = 2.0 * x as f32 / width as f32 - 1.0;
    let ny = 1.0 - 2.0 * y as f32 / height as f32;
    Vec3::new(nx * depth, ny * depth, -depth)
}

/// Convert a depth frame into points, one for each pixel with a valid depth.
///
/// Confidence bytes are mapped to `[0, 1]`; without a confidence buffer every
/// point gets a confidence of `1.0`. Points are emitted in row major order.
///
/// # Example
///
/// ```
/// use lidarkit_3d::depth::{reconstruct_points, DepthFrame};
///
/// let frame = DepthFrame::new(2, 2, vec![1.0, 0.0, 2.0, 25.0]).unwrap();
/// let points = reconstruct_points(frame.view());
/// assert_eq!(points.len(), 2);
/// ```
pub fn reconstruct_points(frame: DepthFrameView<'_>) -> Vec<Point> {
    let mut points = Vec::new();

    for y in 0..frame.height {
        for x in 0..frame.width {
            let index = y * frame.width + x;
            let depth = frame.depth[index];
            if !is_valid_depth(depth) {
                continue;
            }

            let confidence = frame
                .confidence
                .map_or(1.0, |confidence| confidence[index] as f32 / 255.0);

            points.push(Point::new(
                unproject_pixel(x, y, frame.width, frame.height, depth),
                confidence,
            ));
        }
    }

    log::debug!(
        "Reconstructed {} points from a {}x{} depth frame",
        points.len(),
        frame.width,
        frame.height
    );

    points
}

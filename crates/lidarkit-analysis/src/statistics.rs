use glam::Vec3;
use lidarkit_3d::pointcloud::PointCloud;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::density::{analyze_density, SpatialDensity};
use crate::planes::{
    detect_horizontal_planes, detect_vertical_planes, DetectedPlane, PlaneDetectionParams,
};

/// Number of bins in the height histogram.
pub const HEIGHT_HISTOGRAM_BINS: usize = 10;

/// Distribution of point heights along the Y axis.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HeightDistribution {
    /// Lowest height.
    pub floor_height: f32,
    /// Highest height.
    pub ceiling_height: f32,
    /// Upper median height.
    pub median_height: f32,
    /// Bin counts scaled so the fullest bin is 1.
    pub height_histogram: [f32; HEIGHT_HISTOGRAM_BINS],
}

/// Planes found with each orientation preference.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlaneSummary {
    /// Planes found with the vertical angle.
    pub vertical_planes: Vec<DetectedPlane>,
    /// Planes found with the horizontal angle.
    pub horizontal_planes: Vec<DetectedPlane>,
    /// Total of both lists.
    pub dominant_plane_count: usize,
}

/// Summary statistics of a point cloud.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointCloudStatistics {
    /// Number of points.
    pub point_count: usize,
    /// Bounding box extent.
    pub dimensions: Vec3,
    /// Points per cubic meter of bounding box.
    pub density: f32,
    /// Mean sensor confidence.
    pub average_confidence: f32,
    /// Share of points carrying a normal, in percent.
    pub normal_percentage: f32,
    /// Height statistics.
    pub height_distribution: HeightDistribution,
    /// Plane detection results.
    pub plane_summary: PlaneSummary,
    /// Density grid results.
    pub spatial_density: SpatialDensity,
}

/// Parameters for [`analyze_cloud`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisParams {
    /// Plane detection parameters.
    pub plane: PlaneDetectionParams,
    /// Seed for the plane sampling, drawn from the OS when `None`.
    pub random_seed: Option<u64>,
}

fn height_distribution(heights: &mut [f32]) -> HeightDistribution {
    let mut histogram = [0f32; HEIGHT_HISTOGRAM_BINS];
    if heights.is_empty() {
        return HeightDistribution::default();
    }

    heights.sort_by(f32::total_cmp);
    let floor_height = heights[0];
    let ceiling_height = heights[heights.len() - 1];
    let median_height = heights[heights.len() / 2];

    let range = ceiling_height - floor_height;
    if range > 0.0 {
        for height in heights.iter() {
            let normalized = (height - floor_height) / range;
            let bin = ((normalized * HEIGHT_HISTOGRAM_BINS as f32) as usize)
                .min(HEIGHT_HISTOGRAM_BINS - 1);
            histogram[bin] += 1.0;
        }
        let max_count = histogram.iter().copied().fold(0.0, f32::max);
        for bin in histogram.iter_mut() {
            *bin /= max_count;
        }
    }

    HeightDistribution {
        floor_height,
        ceiling_height,
        median_height,
        height_histogram: histogram,
    }
}

/// Compute the statistics of `cloud`, sampling planes with `rng`.
///
/// Vertical planes are searched first, then horizontal planes, both over the
/// full point set. Empty clouds give all-zero statistics.
pub fn analyze<R: Rng + ?Sized>(
    cloud: &PointCloud,
    params: &PlaneDetectionParams,
    rng: &mut R,
) -> PointCloudStatistics {
    let points = cloud.points();
    let point_count = points.len();
    let bounds = cloud.bounding_box();
    let dimensions = bounds.dimensions();
    let volume = dimensions.x * dimensions.y * dimensions.z;

    let (density, average_confidence, normal_percentage) = if point_count == 0 {
        (0.0, 0.0, 0.0)
    } else {
        let total_confidence = points.iter().map(|p| p.confidence).sum::<f32>();
        let with_normals = points.iter().filter(|p| p.normal.is_some()).count();
        let density = if volume > 0.0 {
            point_count as f32 / volume
        } else {
            0.0
        };
        (
            density,
            total_confidence / point_count as f32,
            with_normals as f32 / point_count as f32 * 100.0,
        )
    };

    let mut heights = points.iter().map(|p| p.position.y).collect::<Vec<_>>();
    let height_distribution = height_distribution(&mut heights);

    let vertical_planes = detect_vertical_planes(points, params, rng);
    let horizontal_planes = detect_horizontal_planes(points, params, rng);
    let dominant_plane_count = vertical_planes.len() + horizontal_planes.len();

    let spatial_density = analyze_density(points, &bounds);

    log::debug!(
        "Analyzed {point_count} points: {dominant_plane_count} planes, {} dense regions",
        spatial_density.dense_regions.len()
    );

    PointCloudStatistics {
        point_count,
        dimensions,
        density,
        average_confidence,
        normal_percentage,
        height_distribution,
        plane_summary: PlaneSummary {
            vertical_planes,
            horizontal_planes,
            dominant_plane_count,
        },
        spatial_density,
    }
}

/// Compute the statistics of `cloud` with a generator built from
/// `params.random_seed`.
///
/// # Example
///
/// ```
/// use glam::Vec3;
/// use lidarkit_3d::pointcloud::{Point, PointCloud};
/// use lidarkit_analysis::statistics::{analyze_cloud, AnalysisParams};
///
/// let cloud = PointCloud::from_points(vec![
///     Point::new(Vec3::new(0.0, 0.0, 0.0), 1.0),
///     Point::new(Vec3::new(1.0, 2.0, 1.0), 0.5),
/// ]);
/// let params = AnalysisParams { random_seed: Some(0), ..Default::default() };
/// let stats = analyze_cloud(&cloud, &params);
/// assert_eq!(stats.point_count, 2);
/// assert_eq!(stats.height_distribution.ceiling_height, 2.0);
/// ```
pub fn analyze_cloud(cloud: &PointCloud, params: &AnalysisParams) -> PointCloudStatistics {
    let mut rng = match params.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    analyze(cloud, &params.plane, &mut rng)
}

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use lidarkit_3d::pointcloud::Point;
use rand::Rng;
use serde::Serialize;

/// Angle used to look for walls.
pub const VERTICAL_PLANE_MAX_ANGLE: f32 = 0.2;

/// Angle used to look for floors and ceilings.
pub const HORIZONTAL_PLANE_MAX_ANGLE: f32 = FRAC_PI_2 - 0.2;

/// Parameters for the RANSAC style plane search.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneDetectionParams {
    /// Maximum number of planes extracted per call.
    pub max_planes: usize,
    /// Random triples tried for each plane.
    pub trials: usize,
    /// Point to plane distance, in meters, for a point to belong to a plane.
    pub distance_threshold: f32,
}

impl Default for PlaneDetectionParams {
    fn default() -> Self {
        Self {
            max_planes: 5,
            trials: 10,
            distance_threshold: 0.1,
        }
    }
}

/// A plane found in a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectedPlane {
    /// Mean of the inlier positions.
    pub center: Vec3,
    /// Unit normal.
    pub normal: Vec3,
    /// Extent of the projected inliers on the XZ axes, in square meters.
    pub area: f32,
    /// Number of points within the distance threshold.
    pub inlier_count: usize,
}

/// Area of the XZ bounding rectangle of `inliers` projected onto the plane
/// through the origin with normal `normal`.
fn approximate_area(inliers: &[Vec3], normal: Vec3) -> f32 {
    if inliers.is_empty() {
        return 0.0;
    }

    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for p in inliers {
        let projected = *p - p.dot(normal) * normal;
        min = min.min(projected);
        max = max.max(projected);
    }

    (max.x - min.x) * (max.z - min.z)
}

fn find_largest_plane<R: Rng + ?Sized>(
    points: &[Vec3],
    max_angle_from_vertical: f32,
    params: &PlaneDetectionParams,
    rng: &mut R,
) -> Option<DetectedPlane> {
    if points.len() < 3 {
        return None;
    }

    let up_threshold = max_angle_from_vertical.cos();
    let mut best: Option<DetectedPlane> = None;
    let mut best_count = 0;
    let mut degenerate = 0;

    for _ in 0..params.trials {
        let sample = rand::seq::index::sample(rng, points.len(), 3);
        let (p1, p2, p3) = (
            points[sample.index(0)],
            points[sample.index(1)],
            points[sample.index(2)],
        );

        let Some(mut normal) = (p2 - p1).cross(p3 - p1).try_normalize() else {
            degenerate += 1;
            continue;
        };

        // canonicalize near vertical normals to point up
        if normal.dot(Vec3::Y).abs() > up_threshold && normal.y < 0.0 {
            normal = -normal;
        }

        let inliers = points
            .iter()
            .filter(|p| (**p - p1).dot(normal).abs() < params.distance_threshold)
            .copied()
            .collect::<Vec<_>>();

        if inliers.len() > best_count {
            best_count = inliers.len();
            let center = inliers.iter().copied().sum::<Vec3>() / inliers.len() as f32;
            best = Some(DetectedPlane {
                center,
                normal,
                area: approximate_area(&inliers, normal),
                inlier_count: inliers.len(),
            });
        }
    }

    if degenerate > 0 {
        log::warn!(
            "{degenerate} of {} plane samples were degenerate",
            params.trials
        );
    }

    best
}

/// Extract up to `params.max_planes` planes from `points`.
///
/// Each round keeps the best of `params.trials` random triples, then drops
/// every point within the distance threshold of the found plane before the
/// next round. Detection stops early when fewer than three points remain or
/// no non degenerate triple was drawn.
///
/// `max_angle_from_vertical` only decides which normals get flipped to point
/// up; planes of every orientation are returned.
pub fn detect_planes<R: Rng + ?Sized>(
    points: &[Point],
    max_angle_from_vertical: f32,
    params: &PlaneDetectionParams,
    rng: &mut R,
) -> Vec<DetectedPlane> {
    let mut remaining = points.iter().map(|p| p.position).collect::<Vec<_>>();
    let mut planes = Vec::new();

    while !remaining.is_empty() && planes.len() < params.max_planes {
        let Some(plane) = find_largest_plane(&remaining, max_angle_from_vertical, params, rng)
        else {
            break;
        };

        remaining.retain(|p| (*p - plane.center).dot(plane.normal).abs() > params.distance_threshold);
        planes.push(plane);
    }

    log::debug!(
        "Detected {} planes in {} points, {} left unassigned",
        planes.len(),
        points.len(),
        remaining.len()
    );

    planes
}

/// [`detect_planes`] with [`VERTICAL_PLANE_MAX_ANGLE`].
pub fn detect_vertical_planes<R: Rng + ?Sized>(
    points: &[Point],
    params: &PlaneDetectionParams,
    rng: &mut R,
) -> Vec<DetectedPlane> {
    detect_planes(points, VERTICAL_PLANE_MAX_ANGLE, params, rng)
}

/// [`detect_planes`] with [`HORIZONTAL_PLANE_MAX_ANGLE`].
pub fn detect_horizontal_planes<R: Rng + ?Sized>(
    points: &[Point],
    params: &PlaneDetectionParams,
    rng: &mut R,
) -> Vec<DetectedPlane> {
    detect_planes(points, HORIZONTAL_PLANE_MAX_ANGLE, params, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn grid(n: usize, step: f32, f: impl Fn(f32, f32) -> Vec3) -> Vec<Point> {
        let mut points = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                points.push(Point::new(f(i as f32 * step, j as f32 * step), 1.0));
            }
        }
        points
    }

    #[test]
    fn test_too_few_points() {
        let mut rng = StdRng::seed_from_u64(0);
        let params = PlaneDetectionParams::default();
        assert!(detect_vertical_planes(&[], &params, &mut rng).is_empty());

        let two = vec![Point::new(Vec3::ZERO, 1.0), Point::new(Vec3::X, 1.0)];
        assert!(detect_vertical_planes(&two, &params, &mut rng).is_empty());
    }

    #[test]
    fn test_collinear_points() {
        let mut rng = StdRng::seed_from_u64(1);
        let line = (0..20)
            .map(|i| Point::new(Vec3::new(i as f32, 0.0, 0.0), 1.0))
            .collect::<Vec<_>>();
        let planes = detect_planes(&line, 0.2, &PlaneDetectionParams::default(), &mut rng);
        assert!(planes.is_empty());
    }

    #[test]
    fn test_single_floor() {
        let mut rng = StdRng::seed_from_u64(42);
        let floor = grid(20, 0.1, |x, z| Vec3::new(x, 0.0, z));
        let planes = detect_vertical_planes(&floor, &PlaneDetectionParams::default(), &mut rng);

        assert_eq!(planes.len(), 1);
        let plane = planes[0];
        assert_eq!(plane.inlier_count, 400);
        assert_relative_eq!(plane.normal.y, 1.0, epsilon = 1e-4);
        assert_relative_eq!(plane.center.x, 0.95, epsilon = 1e-4);
        assert_relative_eq!(plane.center.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(plane.center.z, 0.95, epsilon = 1e-4);
        assert_relative_eq!(plane.area, 1.9 * 1.9, epsilon = 1e-3);
    }

    #[test]
    fn test_wall_normal_not_flipped() {
        let mut rng = StdRng::seed_from_u64(7);
        let wall = grid(15, 0.1, |y, z| Vec3::new(1.0, y, z));
        let planes = detect_vertical_planes(&wall, &PlaneDetectionParams::default(), &mut rng);

        assert_eq!(planes.len(), 1);
        assert_relative_eq!(planes[0].normal.x.abs(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(planes[0].center.x, 1.0, epsilon = 1e-4);
        assert_eq!(planes[0].inlier_count, 225);
    }

    #[test]
    fn test_floor_and_wall() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut points = grid(20, 0.1, |x, z| Vec3::new(x, 0.0, z));
        points.extend(grid(20, 0.1, |y, z| Vec3::new(-1.0, y + 0.5, z)));

        let params = PlaneDetectionParams::default();
        let planes = detect_horizontal_planes(&points, &params, &mut rng);

        assert!(!planes.is_empty());
        assert!(planes.len() <= params.max_planes);
        for plane in &planes {
            assert!(plane.inlier_count >= 3);
            // the sampled triple always lies within the threshold of the fitted plane
            let near = points
                .iter()
                .filter(|p| {
                    (p.position - plane.center).dot(plane.normal).abs() <= params.distance_threshold
                })
                .count();
            assert!(near >= 3, "only {near} points near {plane:?}");
            assert_relative_eq!(plane.normal.length(), 1.0, epsilon = 1e-4);
            if plane.normal.y.abs() > HORIZONTAL_PLANE_MAX_ANGLE.cos() {
                assert!(plane.normal.y > 0.0);
            }
        }
    }

    #[test]
    fn test_max_planes() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut points = Vec::new();
        for level in 0..8 {
            points.extend(grid(10, 0.1, |x, z| Vec3::new(x, level as f32, z)));
        }

        let params = PlaneDetectionParams::default();
        let planes = detect_vertical_planes(&points, &params, &mut rng);
        assert_eq!(planes.len(), params.max_planes);

        let params = PlaneDetectionParams {
            max_planes: 2,
            ..Default::default()
        };
        assert_eq!(detect_vertical_planes(&points, &params, &mut rng).len(), 2);
    }

    #[test]
    fn test_seeded_detection_is_reproducible() {
        let mut points = grid(12, 0.1, |x, z| Vec3::new(x, 0.0, z));
        points.extend(grid(12, 0.1, |x, y| Vec3::new(x, y, 2.0)));
        let params = PlaneDetectionParams::default();

        let a = detect_vertical_planes(&points, &params, &mut StdRng::seed_from_u64(5));
        let b = detect_vertical_planes(&points, &params, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_approximate_area() {
        let square = [
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::new(2.0, 3.0, 0.0),
            Vec3::new(0.0, 3.0, 1.5),
        ];
        assert_relative_eq!(approximate_area(&square, Vec3::Y), 3.0);
        assert_eq!(approximate_area(&[], Vec3::Y), 0.0);
    }
}

use std::fmt::Write as _;

use crate::statistics::PointCloudStatistics;

/// Render `stats` as the plain-text request sent to a narrative summary
/// service.
///
/// The reply is free-form text meant for display; nothing in this crate reads
/// it back.
pub fn analysis_prompt(stats: &PointCloudStatistics) -> String {
    let heights = &stats.height_distribution;
    let planes = &stats.plane_summary;
    let density = &stats.spatial_density;

    let histogram = heights
        .height_histogram
        .iter()
        .map(|bin| format!("{bin:.2}"))
        .collect::<Vec<_>>()
        .join(", ");
    let largest_vertical = planes.vertical_planes.first().map_or(0.0, |p| p.area);
    let largest_horizontal = planes.horizontal_planes.first().map_or(0.0, |p| p.area);

    let mut prompt = String::new();
    let _ = write!(
        prompt,
        "Analyze this detailed LiDAR point cloud data and provide specific insights about the captured scene. Here are the statistics:

Basic Information:
- Total points: {point_count}
- Dimensions: {dx:.2}m × {dy:.2}m × {dz:.2}m
- Point density: {density:.2} points/m³
- Average confidence: {confidence:.2}

Height Analysis:
- Floor height: {floor:.2}m
- Ceiling height: {ceiling:.2}m
- Room height: {room:.2}m
- Height distribution (normalized): {histogram}

Plane Analysis:
- Vertical planes detected: {vertical}
- Horizontal planes detected: {horizontal}
- Largest vertical plane area: {largest_vertical:.2}m²
- Largest horizontal plane area: {largest_horizontal:.2}m²

Density Analysis:
- Number of dense regions: {dense}
- Number of sparse regions: {sparse}
- Average local density: {average:.2} points/cell

Based on these detailed statistics, please provide:
1. A specific description of the environment (room type, layout, dimensions)
2. Identification of key architectural features (walls, floor, ceiling, openings)
3. Analysis of potential furniture or objects based on dense regions
4. Technical assessment of scan quality and coverage
5. Specific recommendations for improving the scan

Focus on concrete, actionable insights rather than general observations.",
        point_count = stats.point_count,
        dx = stats.dimensions.x,
        dy = stats.dimensions.y,
        dz = stats.dimensions.z,
        density = stats.density,
        confidence = stats.average_confidence,
        floor = heights.floor_height,
        ceiling = heights.ceiling_height,
        room = heights.ceiling_height - heights.floor_height,
        vertical = planes.vertical_planes.len(),
        horizontal = planes.horizontal_planes.len(),
        dense = density.dense_regions.len(),
        sparse = density.sparse_regions.len(),
        average = density.average_local_density,
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::SpatialDensity;
    use crate::planes::DetectedPlane;
    use crate::statistics::{HeightDistribution, PlaneSummary};
    use glam::Vec3;

    fn stats() -> PointCloudStatistics {
        let mut height_histogram = [0.0; 10];
        height_histogram[0] = 1.0;
        height_histogram[9] = 1.0 / 3.0;
        PointCloudStatistics {
            point_count: 4,
            dimensions: Vec3::new(1.0, 2.5, 3.1),
            density: 0.512,
            average_confidence: 0.5,
            normal_percentage: 50.0,
            height_distribution: HeightDistribution {
                floor_height: -0.25,
                ceiling_height: 2.25,
                median_height: 0.0,
                height_histogram,
            },
            plane_summary: PlaneSummary {
                vertical_planes: vec![DetectedPlane {
                    center: Vec3::ZERO,
                    normal: Vec3::X,
                    area: 4.256,
                    inlier_count: 3,
                }],
                horizontal_planes: vec![],
                dominant_plane_count: 1,
            },
            spatial_density: SpatialDensity {
                average_local_density: 0.032,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_prompt_sections() {
        let prompt = analysis_prompt(&stats());
        assert!(prompt.starts_with("Analyze this detailed LiDAR point cloud data"));
        assert!(prompt.contains("- Total points: 4\n"));
        assert!(prompt.contains("- Dimensions: 1.00m × 2.50m × 3.10m\n"));
        assert!(prompt.contains("- Point density: 0.51 points/m³\n"));
        assert!(prompt.contains("- Room height: 2.50m\n"));
        assert!(prompt.contains(
            "- Height distribution (normalized): 1.00, 0.00, 0.00, 0.00, 0.00, 0.00, 0.00, 0.00, 0.00, 0.33\n"
        ));
        assert!(prompt.contains("- Vertical planes detected: 1\n"));
        assert!(prompt.contains("- Largest vertical plane area: 4.26m²\n"));
        assert!(prompt.contains("- Largest horizontal plane area: 0.00m²\n"));
        assert!(prompt.contains("- Average local density: 0.03 points/cell\n"));
        assert!(prompt.ends_with("rather than general observations."));
    }
}

use glam::Vec3;
use lidarkit_3d::pointcloud::{BoundingBox, Point};
use serde::Serialize;

/// Number of cells along each axis of the density grid.
pub const DENSITY_GRID_SIZE: usize = 5;

const CELL_COUNT: usize = DENSITY_GRID_SIZE * DENSITY_GRID_SIZE * DENSITY_GRID_SIZE;

/// Number of regions kept in each of the dense and sparse lists.
pub const MAX_REPORTED_REGIONS: usize = 5;

/// Point counts over a uniform 5×5×5 subdivision of a bounding box.
///
/// Cells are indexed `x + 5 * y + 25 * z`.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    bounds: BoundingBox,
    counts: [usize; CELL_COUNT],
    total: usize,
}

impl DensityGrid {
    /// Count `points` into the cells of `bounds`.
    ///
    /// Points outside the box land in the nearest border cell. An axis with
    /// zero extent maps every point to its first cell.
    pub fn from_points(points: &[Point], bounds: &BoundingBox) -> Self {
        let mut grid = Self {
            bounds: *bounds,
            counts: [0; CELL_COUNT],
            total: points.len(),
        };
        for point in points {
            let index = grid.cell_index(point.position);
            grid.counts[index] += 1;
        }
        grid
    }

    /// Flat index of the cell containing `position`.
    pub fn cell_index(&self, position: Vec3) -> usize {
        let dims = self.bounds.dimensions();
        let offset = position - self.bounds.min;

        let axis = |offset: f32, extent: f32| -> usize {
            let normalized = if extent > 0.0 { offset / extent } else { 0.0 };
            let cell = (normalized * DENSITY_GRID_SIZE as f32).floor() as isize;
            cell.clamp(0, DENSITY_GRID_SIZE as isize - 1) as usize
        };

        let x = axis(offset.x, dims.x);
        let y = axis(offset.y, dims.y);
        let z = axis(offset.z, dims.z);
        x + y * DENSITY_GRID_SIZE + z * DENSITY_GRID_SIZE * DENSITY_GRID_SIZE
    }

    /// World position of the center of cell `index`.
    pub fn cell_center(&self, index: usize) -> Vec3 {
        let n = DENSITY_GRID_SIZE as f32;
        let x = (index % DENSITY_GRID_SIZE) as f32;
        let y = ((index / DENSITY_GRID_SIZE) % DENSITY_GRID_SIZE) as f32;
        let z = (index / (DENSITY_GRID_SIZE * DENSITY_GRID_SIZE)) as f32;
        self.bounds.min
            + self.bounds.dimensions() * Vec3::new((x + 0.5) / n, (y + 0.5) / n, (z + 0.5) / n)
    }

    /// Per cell point counts.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Points per cell averaged over all cells.
    pub fn average_count(&self) -> f32 {
        self.total as f32 / CELL_COUNT as f32
    }
}

/// A grid cell reported as unusually dense or sparse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensityRegion {
    /// Center of the cell.
    pub center: Vec3,
    /// Number of points in the cell.
    pub density: f32,
}

/// Dense and sparse cells of a point set.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SpatialDensity {
    /// Cells with more than twice the average count, densest first.
    pub dense_regions: Vec<DensityRegion>,
    /// Cells with less than half the average count, emptiest first.
    pub sparse_regions: Vec<DensityRegion>,
    /// Average number of points per cell.
    pub average_local_density: f32,
}

/// Find the densest and sparsest cells of `points` within `bounds`.
pub fn analyze_density(points: &[Point], bounds: &BoundingBox) -> SpatialDensity {
    let grid = DensityGrid::from_points(points, bounds);
    let average = grid.average_count();

    let mut dense_regions = Vec::new();
    let mut sparse_regions = Vec::new();
    for (index, &count) in grid.counts().iter().enumerate() {
        let density = count as f32;
        let region = DensityRegion {
            center: grid.cell_center(index),
            density,
        };
        if density > average * 2.0 {
            dense_regions.push(region);
        } else if density < average * 0.5 {
            sparse_regions.push(region);
        }
    }

    dense_regions.sort_by(|a, b| b.density.total_cmp(&a.density));
    sparse_regions.sort_by(|a, b| a.density.total_cmp(&b.density));
    dense_regions.truncate(MAX_REPORTED_REGIONS);
    sparse_regions.truncate(MAX_REPORTED_REGIONS);

    SpatialDensity {
        dense_regions,
        sparse_regions,
        average_local_density: average,
    }
}

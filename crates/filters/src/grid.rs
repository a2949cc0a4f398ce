use voxelgrid_core::Aabb;

use crate::error::{FilterError, FilterResult};

// Per-axis cell indices must fit 32 bits; the flattened key must fit u64.
const MAX_AXIS_CELLS: f64 = u32::MAX as f64;

/// Geometry of a uniform voxel grid over a bounding box.
///
/// Construction validates the leaf size and proves that the flattened
/// voxel-key space fits in `u64` before any point is indexed. The key
/// encoding `ix + iy*nx + iz*nx*ny` is a bijection between valid cell
/// triples and `[0, nx*ny*nz)`, so two points share a key iff they fall
/// in the same cell.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    min: [f32; 3],
    inv_leaf: [f32; 3],
    dims: [u64; 3],
}

impl VoxelGrid {
    pub fn from_bounds(bounds: &Aabb, leaf_size: [f32; 3]) -> FilterResult<Self> {
        if leaf_size.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(FilterError::InvalidLeafSize(
                leaf_size[0],
                leaf_size[1],
                leaf_size[2],
            ));
        }

        if bounds.is_empty() {
            return Err(FilterError::NoFinitePoints);
        }

        let extent = bounds.extent();
        let overflow = || FilterError::GridOverflow {
            leaf: leaf_size,
            extent,
        };

        let mut dims = [1u64; 3];
        for axis in 0..3 {
            let cells = (f64::from(extent[axis]) / f64::from(leaf_size[axis])).ceil() + 1.0;
            if !cells.is_finite() || cells > MAX_AXIS_CELLS {
                return Err(overflow());
            }
            dims[axis] = (cells as u64).max(1);
        }

        dims[0]
            .checked_mul(dims[1])
            .and_then(|p| p.checked_mul(dims[2]))
            .ok_or_else(overflow)?;

        Ok(Self {
            min: bounds.min,
            inv_leaf: [
                1.0 / leaf_size[0],
                1.0 / leaf_size[1],
                1.0 / leaf_size[2],
            ],
            dims,
        })
    }

    /// Division counts per axis, each >= 1.
    pub fn dims(&self) -> [u64; 3] {
        self.dims
    }

    /// Total number of addressable cells. Fits u64 by construction.
    pub fn num_cells(&self) -> u64 {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Per-axis cell indices of a point, clamped into `[0, dims-1]` to
    /// absorb float rounding at the max boundary. Callers filter out
    /// non-finite points before indexing.
    pub fn cell(&self, point: [f32; 3]) -> [u64; 3] {
        let mut cell = [0u64; 3];
        for axis in 0..3 {
            let i = ((point[axis] - self.min[axis]) * self.inv_leaf[axis]).floor();
            cell[axis] = (i.max(0.0) as u64).min(self.dims[axis] - 1);
        }
        cell
    }

    /// Flattened voxel key of a point.
    pub fn key(&self, point: [f32; 3]) -> u64 {
        let [ix, iy, iz] = self.cell(point);
        ix + iy * self.dims[0] + iz * self.dims[0] * self.dims[1]
    }
}

#[cfg(test)]
mod tests {
    use super::VoxelGrid;
    use crate::error::FilterError;
    use voxelgrid_core::{Aabb, PointCloud};

    fn bounds_of(points: &[[f32; 3]]) -> Aabb {
        let mut aabb = Aabb::empty();
        for &p in points {
            aabb.expand_with_point(p);
        }
        aabb
    }

    #[test]
    fn dims_follow_ceil_plus_one() {
        let bounds = bounds_of(&[[0.0, 0.0, 0.0], [1.0, 2.0, 0.5]]);
        let grid = VoxelGrid::from_bounds(&bounds, [0.5, 0.5, 0.5]).unwrap();
        // ceil(1/0.5)+1 = 3, ceil(2/0.5)+1 = 5, ceil(0.5/0.5)+1 = 2
        assert_eq!(grid.dims(), [3, 5, 2]);
        assert_eq!(grid.num_cells(), 30);
    }

    #[test]
    fn degenerate_axis_gets_one_cell() {
        let bounds = bounds_of(&[[0.0, 3.0, -1.0], [4.0, 3.0, -1.0]]);
        let grid = VoxelGrid::from_bounds(&bounds, [1.0, 1.0, 1.0]).unwrap();
        assert_eq!(grid.dims(), [5, 1, 1]);
    }

    #[test]
    fn key_is_mixed_radix_in_x_then_y_then_z() {
        let bounds = bounds_of(&[[0.0, 0.0, 0.0], [2.0, 2.0, 2.0]]);
        let grid = VoxelGrid::from_bounds(&bounds, [1.0, 1.0, 1.0]).unwrap();
        let [nx, ny, _] = grid.dims();

        assert_eq!(grid.key([0.0, 0.0, 0.0]), 0);
        assert_eq!(grid.key([1.5, 0.0, 0.0]), 1);
        assert_eq!(grid.key([0.0, 1.5, 0.0]), nx);
        assert_eq!(grid.key([0.0, 0.0, 1.5]), nx * ny);
    }

    #[test]
    fn same_cell_same_key_different_cell_different_key() {
        let bounds = bounds_of(&[[0.0, 0.0, 0.0], [10.0, 10.0, 10.0]]);
        let grid = VoxelGrid::from_bounds(&bounds, [1.0, 1.0, 1.0]).unwrap();

        // Both in cell (0,0,0)
        assert_eq!(grid.key([0.1, 0.2, 0.3]), grid.key([0.9, 0.8, 0.7]));
        // Neighboring cells along each axis differ
        assert_ne!(grid.key([0.5, 0.5, 0.5]), grid.key([1.5, 0.5, 0.5]));
        assert_ne!(grid.key([0.5, 0.5, 0.5]), grid.key([0.5, 1.5, 0.5]));
        assert_ne!(grid.key([0.5, 0.5, 0.5]), grid.key([0.5, 0.5, 1.5]));
    }

    #[test]
    fn max_boundary_clamps_into_grid() {
        let bounds = bounds_of(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let grid = VoxelGrid::from_bounds(&bounds, [0.1, 0.1, 0.1]).unwrap();
        let [nx, ny, nz] = grid.dims();
        let cell = grid.cell([1.0, 1.0, 1.0]);
        assert!(cell[0] < nx && cell[1] < ny && cell[2] < nz);
        assert!(grid.key([1.0, 1.0, 1.0]) < grid.num_cells());
    }

    #[test]
    fn rejects_non_positive_leaf() {
        let bounds = bounds_of(&[[0.0; 3], [1.0; 3]]);
        for leaf in [
            [0.0, 1.0, 1.0],
            [1.0, -0.5, 1.0],
            [1.0, 1.0, f32::NAN],
            [f32::INFINITY, 1.0, 1.0],
        ] {
            let err = VoxelGrid::from_bounds(&bounds, leaf).unwrap_err();
            assert!(
                matches!(err, FilterError::InvalidLeafSize(..)),
                "leaf {leaf:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_empty_bounds() {
        let cloud = PointCloud::new();
        let err = VoxelGrid::from_bounds(&cloud.aabb(), [1.0; 3]).unwrap_err();
        assert_eq!(err, FilterError::NoFinitePoints);
    }

    #[test]
    fn leaf_validation_precedes_empty_bounds() {
        let cloud = PointCloud::new();
        let err = VoxelGrid::from_bounds(&cloud.aabb(), [0.0; 3]).unwrap_err();
        assert!(matches!(err, FilterError::InvalidLeafSize(..)));
    }

    #[test]
    fn per_axis_overflow_is_caught() {
        let bounds = bounds_of(&[[0.0; 3], [1e30; 3]]);
        let err = VoxelGrid::from_bounds(&bounds, [1e-7; 3]).unwrap_err();
        assert!(matches!(err, FilterError::GridOverflow { .. }));
    }

    #[test]
    fn key_space_product_overflow_is_caught() {
        // Each axis fits 32 bits (~3e9 cells) but the product blows u64.
        let bounds = bounds_of(&[[0.0; 3], [3e9; 3]]);
        let err = VoxelGrid::from_bounds(&bounds, [1.0; 3]).unwrap_err();
        assert!(matches!(err, FilterError::GridOverflow { .. }));
    }
}

#![forbid(unsafe_code)]

//! Voxel-grid downsampling for 3D point clouds.
//!
//! Re-exports the workspace crates: [`voxelgrid_core`] for the cloud and
//! bounding-box types, [`voxelgrid_filters`] for the downsampling pipeline,
//! and [`voxelgrid_io`] for PCD/PLY readers and writers.

pub use voxelgrid_core::{Aabb, Colors, PointCloud};
pub use voxelgrid_filters::{
    voxel_downsample, voxel_downsample_par, FieldMode, FilterError, FilterResult, VoxelGrid,
    VoxelGridParams,
};
pub use voxelgrid_io as io;

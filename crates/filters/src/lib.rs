#![forbid(unsafe_code)]

pub mod error;
pub mod grid;
pub mod params;
pub mod voxel_downsample;

pub use error::{FilterError, FilterResult};
pub use grid::VoxelGrid;
pub use params::{FieldMode, VoxelGridParams};
pub use voxel_downsample::{voxel_downsample, voxel_downsample_par};

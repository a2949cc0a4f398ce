use thiserror::Error;

pub type FilterResult<T> = Result<T, FilterError>;

/// Errors produced by the voxel-grid pipeline.
///
/// All variants are recoverable at the call site; a caller that hits
/// [`FilterError::GridOverflow`] can retry with a larger leaf size.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// The cloud has no point with three finite coordinates, so no
    /// bounding box (and no grid) can be defined over it.
    #[error("cloud contains no finite points")]
    NoFinitePoints,

    /// Every leaf component must be finite and strictly positive.
    #[error("leaf size [{0}, {1}, {2}] must be finite and > 0 on every axis")]
    InvalidLeafSize(f32, f32, f32),

    /// The requested leaf size needs more voxels than the 64-bit key
    /// space can address over this cloud's extent.
    #[error(
        "leaf size {leaf:?} over extent {extent:?} exceeds the voxel key space; \
         increase the leaf size"
    )]
    GridOverflow { leaf: [f32; 3], extent: [f32; 3] },
}

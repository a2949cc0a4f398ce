/// Which point fields the downsampled centroids carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldMode {
    /// Average every field the input cloud carries (coordinates plus
    /// intensity and colors when present).
    #[default]
    AllFields,
    /// Average coordinates only; the output carries no auxiliary fields.
    XyzOnly,
}

/// Configuration for one voxel-grid downsampling call.
///
/// A plain immutable value passed into the pipeline entry points; there is
/// no process-wide default state.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGridParams {
    /// Voxel edge length per axis. Every component must be finite and > 0.
    pub leaf_size: [f32; 3],

    /// Voxels holding fewer points than this are dropped from the output.
    /// Accumulation still covers them; the threshold applies at emission.
    pub min_points_per_voxel: usize,

    pub field_mode: FieldMode,
}

impl Default for VoxelGridParams {
    fn default() -> Self {
        Self {
            leaf_size: [0.05; 3],
            min_points_per_voxel: 1,
            field_mode: FieldMode::AllFields,
        }
    }
}

impl VoxelGridParams {
    /// Params with the same leaf edge on every axis.
    #[must_use]
    pub fn uniform(leaf: f32) -> Self {
        Self {
            leaf_size: [leaf; 3],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn leaf_size(mut self, leaf: [f32; 3]) -> Self {
        self.leaf_size = leaf;
        self
    }

    #[must_use]
    pub fn min_points_per_voxel(mut self, min: usize) -> Self {
        self.min_points_per_voxel = min;
        self
    }

    #[must_use]
    pub fn field_mode(mut self, mode: FieldMode) -> Self {
        self.field_mode = mode;
        self
    }
}

use std::ops::Range;

use hashbrown::HashMap;
use rayon::prelude::*;
use tracing::debug;
use voxelgrid_core::{Colors, PointCloud};

use crate::error::{FilterError, FilterResult};
use crate::grid::VoxelGrid;
use crate::params::{FieldMode, VoxelGridParams};

/// Running sums for one occupied voxel.
#[derive(Default, Clone, Copy)]
struct VoxelAccum {
    sx: f32,
    sy: f32,
    sz: f32,
    si: f32,
    sr: f32,
    sg: f32,
    sb: f32,
    n: usize,
}

impl VoxelAccum {
    fn add_point(&mut self, cloud: &PointCloud, i: usize, all_fields: bool) {
        self.sx += cloud.x[i];
        self.sy += cloud.y[i];
        self.sz += cloud.z[i];

        if all_fields {
            if let Some(ref intensity) = cloud.intensity {
                self.si += intensity[i];
            }
            if let Some(ref colors) = cloud.colors {
                self.sr += f32::from(colors.r[i]);
                self.sg += f32::from(colors.g[i]);
                self.sb += f32::from(colors.b[i]);
            }
        }

        self.n += 1;
    }

    fn merge(&mut self, other: &VoxelAccum) {
        self.sx += other.sx;
        self.sy += other.sy;
        self.sz += other.sz;
        self.si += other.si;
        self.sr += other.sr;
        self.sg += other.sg;
        self.sb += other.sb;
        self.n += other.n;
    }
}

/// Downsample a cloud by replacing all points inside each voxel with their
/// centroid.
///
/// The grid is anchored at the cloud's minimum corner with cubic cells of
/// `params.leaf_size`. Points with any non-finite coordinate are skipped.
/// Output points are emitted in ascending voxel-key order, so repeated runs
/// over the same input and configuration produce identical output.
///
/// An empty cloud, or one whose points are all non-finite, downsamples to an
/// empty cloud. Invalid leaf sizes and grids too large for the key space are
/// reported as errors before any accumulation happens.
pub fn voxel_downsample(cloud: &PointCloud, params: &VoxelGridParams) -> FilterResult<PointCloud> {
    let grid = match VoxelGrid::from_bounds(&cloud.aabb(), params.leaf_size) {
        Ok(grid) => grid,
        Err(FilterError::NoFinitePoints) => return Ok(empty_output(cloud, params)),
        Err(e) => return Err(e),
    };

    let all_fields = params.field_mode == FieldMode::AllFields;
    let bins = accumulate(cloud, &grid, all_fields, 0..cloud.len());

    debug!(
        cells = grid.num_cells(),
        occupied = bins.len(),
        input = cloud.len(),
        "voxel accumulation done"
    );

    Ok(assemble(cloud, &bins, params))
}

// Points per parallel accumulation chunk.
const PAR_CHUNK: usize = 32 * 1024;

/// [`voxel_downsample`] with rayon-parallel accumulation.
///
/// Points are split into fixed-size index chunks; each chunk builds a
/// private key-to-accumulator map, and the partial maps are merged in chunk
/// order. The fixed split and in-order merge keep this path deterministic
/// run-to-run, though its centroids may differ from the sequential path in
/// the last float digit (different summation order).
pub fn voxel_downsample_par(
    cloud: &PointCloud,
    params: &VoxelGridParams,
) -> FilterResult<PointCloud> {
    let grid = match VoxelGrid::from_bounds(&cloud.aabb(), params.leaf_size) {
        Ok(grid) => grid,
        Err(FilterError::NoFinitePoints) => return Ok(empty_output(cloud, params)),
        Err(e) => return Err(e),
    };

    let all_fields = params.field_mode == FieldMode::AllFields;

    let ranges: Vec<Range<usize>> = (0..cloud.len())
        .step_by(PAR_CHUNK)
        .map(|start| start..(start + PAR_CHUNK).min(cloud.len()))
        .collect();

    let partials: Vec<HashMap<u64, VoxelAccum>> = ranges
        .into_par_iter()
        .map(|range| accumulate(cloud, &grid, all_fields, range))
        .collect();

    // Merge in chunk order; per-key sums then happen in a fixed order.
    let mut bins: HashMap<u64, VoxelAccum> = HashMap::new();
    for partial in partials {
        for (key, acc) in partial {
            bins.entry(key).or_default().merge(&acc);
        }
    }

    debug!(
        cells = grid.num_cells(),
        occupied = bins.len(),
        input = cloud.len(),
        "parallel voxel accumulation done"
    );

    Ok(assemble(cloud, &bins, params))
}

fn empty_output(cloud: &PointCloud, params: &VoxelGridParams) -> PointCloud {
    match params.field_mode {
        FieldMode::AllFields => cloud.empty_like(),
        FieldMode::XyzOnly => PointCloud::new(),
    }
}

fn accumulate(
    cloud: &PointCloud,
    grid: &VoxelGrid,
    all_fields: bool,
    range: Range<usize>,
) -> HashMap<u64, VoxelAccum> {
    let mut bins: HashMap<u64, VoxelAccum> = HashMap::new();

    for i in range {
        if !cloud.is_finite(i) {
            continue;
        }
        let key = grid.key(cloud.point(i));
        bins.entry(key).or_default().add_point(cloud, i, all_fields);
    }

    bins
}

fn assemble(
    cloud: &PointCloud,
    bins: &HashMap<u64, VoxelAccum>,
    params: &VoxelGridParams,
) -> PointCloud {
    let all_fields = params.field_mode == FieldMode::AllFields;
    let want_intensity = all_fields && cloud.has_intensity();
    let want_colors = all_fields && cloud.has_colors();

    let mut keys: Vec<u64> = bins
        .iter()
        .filter(|(_, acc)| acc.n >= params.min_points_per_voxel)
        .map(|(key, _)| *key)
        .collect();
    keys.sort_unstable();

    let mut x = Vec::with_capacity(keys.len());
    let mut y = Vec::with_capacity(keys.len());
    let mut z = Vec::with_capacity(keys.len());
    let mut intensity = Vec::with_capacity(if want_intensity { keys.len() } else { 0 });
    let mut r = Vec::with_capacity(if want_colors { keys.len() } else { 0 });
    let mut g = Vec::with_capacity(if want_colors { keys.len() } else { 0 });
    let mut b = Vec::with_capacity(if want_colors { keys.len() } else { 0 });

    for key in keys {
        let acc = &bins[&key];
        let denom = acc.n as f32;

        x.push(acc.sx / denom);
        y.push(acc.sy / denom);
        z.push(acc.sz / denom);

        if want_intensity {
            intensity.push(acc.si / denom);
        }
        if want_colors {
            r.push((acc.sr / denom).round() as u8);
            g.push((acc.sg / denom).round() as u8);
            b.push((acc.sb / denom).round() as u8);
        }
    }

    let mut out = PointCloud::from_xyz(x, y, z);
    if want_intensity {
        out.intensity = Some(intensity);
    }
    if want_colors {
        out.colors = Some(Colors { r, g, b });
    }
    out
}

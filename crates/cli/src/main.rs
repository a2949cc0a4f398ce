use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxelgrid_core::PointCloud;
use voxelgrid_filters::{voxel_downsample, FieldMode, VoxelGridParams};
use voxelgrid_io::{read_pcd, read_ply, write_pcd, write_pcd_binary, write_ply, write_ply_binary};

/// Downsample a point cloud onto a uniform voxel grid.
#[derive(Parser)]
#[command(name = "voxelgrid", version, about)]
struct Cli {
    /// Input cloud (.pcd or .ply)
    input: PathBuf,

    /// Output cloud (.pcd or .ply)
    output: PathBuf,

    /// Voxel edge length, applied to all three axes
    #[arg(long, default_value_t = 0.005)]
    leaf: f32,

    /// Drop voxels holding fewer points than this
    #[arg(long, default_value_t = 1)]
    min_points: usize,

    /// Average coordinates only, dropping intensity and colors
    #[arg(long)]
    xyz_only: bool,

    /// Write the output in binary instead of ASCII
    #[arg(long)]
    binary: bool,
}

fn load(path: &Path) -> Result<PointCloud> {
    let cloud = match extension(path) {
        Some("pcd") => read_pcd(path),
        Some("ply") => read_ply(path),
        _ => bail!("unsupported input format: {} (expected .pcd or .ply)", path.display()),
    };
    cloud.with_context(|| format!("failed to read {}", path.display()))
}

fn store(path: &Path, cloud: &PointCloud, binary: bool) -> Result<()> {
    let result = match (extension(path), binary) {
        (Some("pcd"), false) => write_pcd(path, cloud),
        (Some("pcd"), true) => write_pcd_binary(path, cloud),
        (Some("ply"), false) => write_ply(path, cloud),
        (Some("ply"), true) => write_ply_binary(path, cloud),
        _ => bail!("unsupported output format: {} (expected .pcd or .ply)", path.display()),
    };
    result.with_context(|| format!("failed to write {}", path.display()))
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cloud = load(&cli.input)?;
    info!(points = cloud.len(), input = %cli.input.display(), "loaded cloud");

    let params = VoxelGridParams::uniform(cli.leaf)
        .min_points_per_voxel(cli.min_points)
        .field_mode(if cli.xyz_only {
            FieldMode::XyzOnly
        } else {
            FieldMode::AllFields
        });

    let downsampled = voxel_downsample(&cloud, &params)?;
    info!(
        points = downsampled.len(),
        leaf = cli.leaf,
        "downsampled cloud"
    );

    store(&cli.output, &downsampled, cli.binary)?;
    info!(output = %cli.output.display(), "wrote cloud");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn parses_paths_and_defaults() {
        let cli = Cli::parse_from(["voxelgrid", "in.pcd", "out.pcd"]);
        assert_eq!(cli.leaf, 0.005);
        assert_eq!(cli.min_points, 1);
        assert!(!cli.xyz_only);
        assert!(!cli.binary);
    }

    #[test]
    fn missing_arguments_are_an_error() {
        assert!(Cli::try_parse_from(["voxelgrid", "only_one.pcd"]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "voxelgrid",
            "in.ply",
            "out.ply",
            "--leaf",
            "0.1",
            "--min-points",
            "3",
            "--xyz-only",
            "--binary",
        ]);
        assert_eq!(cli.leaf, 0.1);
        assert_eq!(cli.min_points, 3);
        assert!(cli.xyz_only);
        assert!(cli.binary);
    }
}

use voxelgrid_core::PointCloud;

use std::fs;
use std::io;
use std::path::Path;

/// Reads a PCD file (ASCII or binary format).
///
/// The `x`, `y`, `z` fields are required; an `intensity` field is carried
/// into the cloud when present. Other fields are ignored.
pub fn read_pcd(path: impl AsRef<Path>) -> io::Result<PointCloud> {
    let raw = fs::read(path)?;

    let header = find_header(&raw)?;
    let data_format = parse_data_format(&header)?;
    let num_points = parse_points_count(&header)?;
    let field_names = parse_fields(&header);

    let layout = FieldLayout::resolve(&field_names)?;

    match data_format {
        DataFormat::Ascii => read_pcd_ascii(&raw, &layout),
        DataFormat::Binary => read_pcd_binary(&raw, num_points, &field_names, &layout),
    }
}

/// Writes a PCD file in ASCII format.
pub fn write_pcd(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let mut out = pcd_header(cloud, "ascii");

    for i in 0..cloud.len() {
        out.push_str(&format!("{} {} {}", cloud.x[i], cloud.y[i], cloud.z[i]));
        if let Some(ref intensity) = cloud.intensity {
            out.push_str(&format!(" {}", intensity[i]));
        }
        out.push('\n');
    }

    fs::write(path, out)
}

/// Writes a PCD file in binary format.
pub fn write_pcd_binary(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let header = pcd_header(cloud, "binary");
    let header_bytes = header.as_bytes();

    let num_fields = if cloud.has_intensity() { 4 } else { 3 };
    let mut buf = Vec::with_capacity(header_bytes.len() + cloud.len() * num_fields * 4);
    buf.extend_from_slice(header_bytes);

    for i in 0..cloud.len() {
        buf.extend_from_slice(&cloud.x[i].to_le_bytes());
        buf.extend_from_slice(&cloud.y[i].to_le_bytes());
        buf.extend_from_slice(&cloud.z[i].to_le_bytes());
        if let Some(ref intensity) = cloud.intensity {
            buf.extend_from_slice(&intensity[i].to_le_bytes());
        }
    }

    fs::write(path, buf)
}

// --- Internal helpers ---

#[derive(Debug, PartialEq)]
enum DataFormat {
    Ascii,
    Binary,
}

/// Column positions of the fields we read.
struct FieldLayout {
    idx_x: usize,
    idx_y: usize,
    idx_z: usize,
    idx_intensity: Option<usize>,
}

impl FieldLayout {
    fn resolve(field_names: &[String]) -> io::Result<Self> {
        let position = |name: &str| field_names.iter().position(|n| n == name);

        match (position("x"), position("y"), position("z")) {
            (Some(idx_x), Some(idx_y), Some(idx_z)) => Ok(Self {
                idx_x,
                idx_y,
                idx_z,
                idx_intensity: position("intensity"),
            }),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "PCD file missing x, y, z fields",
            )),
        }
    }
}

fn pcd_header(cloud: &PointCloud, data: &str) -> String {
    let (fields, size, typ, count) = if cloud.has_intensity() {
        ("x y z intensity", "4 4 4 4", "F F F F", "1 1 1 1")
    } else {
        ("x y z", "4 4 4", "F F F", "1 1 1")
    };

    let mut out = String::new();
    out.push_str("# .PCD v0.7 - Point Cloud Data file format\n");
    out.push_str("VERSION 0.7\n");
    out.push_str(&format!("FIELDS {}\n", fields));
    out.push_str(&format!("SIZE {}\n", size));
    out.push_str(&format!("TYPE {}\n", typ));
    out.push_str(&format!("COUNT {}\n", count));
    out.push_str(&format!("WIDTH {}\n", cloud.len()));
    out.push_str("HEIGHT 1\n");
    out.push_str("VIEWPOINT 0 0 0 1 0 0 0\n");
    out.push_str(&format!("POINTS {}\n", cloud.len()));
    out.push_str(&format!("DATA {}\n", data));
    out
}

/// Extracts the header portion as a UTF-8 string (everything up to and including the DATA line).
fn find_header(raw: &[u8]) -> io::Result<String> {
    let text = std::str::from_utf8(raw)
        .ok()
        .or_else(|| {
            // For binary files the header is ASCII but the body is not;
            // cut at the end of the DATA line before decoding.
            find_data_line_end(raw).and_then(|end| std::str::from_utf8(&raw[..end]).ok())
        })
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "PCD header is not valid UTF-8")
        })?;

    for line in text.lines() {
        if line.trim_start().starts_with("DATA") {
            let offset = text
                .find(line)
                .map(|pos| pos + line.len())
                .unwrap_or(text.len());
            return Ok(text[..offset].to_string());
        }
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "PCD file missing DATA line",
    ))
}

/// Finds the byte offset just past the newline ending the DATA line.
fn find_data_line_end(raw: &[u8]) -> Option<usize> {
    let data_marker = b"DATA";
    for i in 0..raw.len().saturating_sub(data_marker.len()) {
        if (i == 0 || raw[i - 1] == b'\n') && raw[i..].starts_with(data_marker) {
            if let Some(offset) = raw[i..].iter().position(|&b| b == b'\n') {
                return Some(i + offset + 1);
            }
            return Some(raw.len());
        }
    }
    None
}

fn parse_data_format(header: &str) -> io::Result<DataFormat> {
    for line in header.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("DATA") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() >= 2 {
                return match parts[1] {
                    "ascii" => Ok(DataFormat::Ascii),
                    "binary" => Ok(DataFormat::Binary),
                    other => Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!("unsupported PCD DATA format: {}", other),
                    )),
                };
            }
        }
    }
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "PCD file missing DATA line",
    ))
}

fn parse_points_count(header: &str) -> io::Result<usize> {
    for line in header.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("POINTS") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() >= 2 {
                return parts[1].parse::<usize>().map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid POINTS value: {}", e),
                    )
                });
            }
        }
    }

    // Fall back to WIDTH if POINTS is not found
    for line in header.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("WIDTH") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() >= 2 {
                return parts[1].parse::<usize>().map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid WIDTH value: {}", e),
                    )
                });
            }
        }
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "PCD file missing POINTS/WIDTH header",
    ))
}

fn parse_fields(header: &str) -> Vec<String> {
    for line in header.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("FIELDS") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            return parts[1..].iter().map(|s| s.to_string()).collect();
        }
    }
    // Default to x y z if no FIELDS line found
    vec!["x".to_string(), "y".to_string(), "z".to_string()]
}

fn read_pcd_ascii(raw: &[u8], layout: &FieldLayout) -> io::Result<PointCloud> {
    let content = std::str::from_utf8(raw)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid UTF-8: {}", e)))?;

    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut z = Vec::new();
    let mut intensity = Vec::new();

    let mut in_data = false;
    for line in content.lines() {
        if line.trim_start().starts_with("DATA") {
            in_data = true;
            continue;
        }
        if !in_data || line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        let parse_f32 = |idx: usize| parts.get(idx).and_then(|s| s.parse::<f32>().ok());

        x.push(parse_f32(layout.idx_x).unwrap_or(0.0));
        y.push(parse_f32(layout.idx_y).unwrap_or(0.0));
        z.push(parse_f32(layout.idx_z).unwrap_or(0.0));
        if let Some(idx) = layout.idx_intensity {
            intensity.push(parse_f32(idx).unwrap_or(0.0));
        }
    }

    let mut cloud = PointCloud::from_xyz(x, y, z);
    if layout.idx_intensity.is_some() {
        cloud.intensity = Some(intensity);
    }
    Ok(cloud)
}

fn read_pcd_binary(
    raw: &[u8],
    num_points: usize,
    field_names: &[String],
    layout: &FieldLayout,
) -> io::Result<PointCloud> {
    let data_offset = find_data_line_end(raw).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "cannot find DATA line in binary PCD",
        )
    })?;

    let num_fields = field_names.len();
    let point_byte_size = num_fields * 4; // Each field is an f32 (4 bytes)
    let data_slice = &raw[data_offset..];
    let expected_size = num_points * point_byte_size;

    if data_slice.len() < expected_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "binary PCD data too short: have {} bytes, expected {} ({} points x {} fields x 4)",
                data_slice.len(),
                expected_size,
                num_points,
                num_fields
            ),
        ));
    }

    let mut x = Vec::with_capacity(num_points);
    let mut y = Vec::with_capacity(num_points);
    let mut z = Vec::with_capacity(num_points);
    let mut intensity = Vec::with_capacity(if layout.idx_intensity.is_some() {
        num_points
    } else {
        0
    });

    for pi in 0..num_points {
        let point_buf = &data_slice[pi * point_byte_size..(pi + 1) * point_byte_size];

        let read_f32_at = |field_idx: usize| -> f32 {
            let off = field_idx * 4;
            f32::from_le_bytes([
                point_buf[off],
                point_buf[off + 1],
                point_buf[off + 2],
                point_buf[off + 3],
            ])
        };

        x.push(read_f32_at(layout.idx_x));
        y.push(read_f32_at(layout.idx_y));
        z.push(read_f32_at(layout.idx_z));
        if let Some(idx) = layout.idx_intensity {
            intensity.push(read_f32_at(idx));
        }
    }

    let mut cloud = PointCloud::from_xyz(x, y, z);
    if layout.idx_intensity.is_some() {
        cloud.intensity = Some(intensity);
    }
    Ok(cloud)
}

use std::fmt::Write as _;
use std::path::Path;

use super::{properties::PlyVertex, PlyError, PlyFormat, VERTEX_PROPERTIES};
use crate::pointcloud::PointCloud;

/// Build the textual PLY header for `vertex_count` vertices.
pub fn ply_header(format: PlyFormat, vertex_count: usize) -> String {
    let mut header = String::new();
    header.push_str("ply\n");
    header.push_str(&format!("format {} 1.0\n", format.keyword()));
    header.push_str(&format!("element vertex {vertex_count}\n"));
    for (name, data_type) in VERTEX_PROPERTIES.iter() {
        header.push_str(&format!("property {} {}\n", data_type.keyword(), name));
    }
    header.push_str("end_header\n");
    header
}

fn write_ascii_record(output: &mut String, vertex: &PlyVertex) {
    // `{:.6}` matches printf `%f`
    let _ = writeln!(
        output,
        "{:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {} {} {} {}",
        vertex.x,
        vertex.y,
        vertex.z,
        vertex.nx,
        vertex.ny,
        vertex.nz,
        vertex.confidence,
        vertex.red,
        vertex.green,
        vertex.blue,
        vertex.alpha,
    );
}

/// Encode a point cloud as PLY bytes.
///
/// Points without a normal are written with a zero normal and points without a
/// color are written opaque white. Timestamp, metadata, intensity and transform
/// are not part of the format.
///
/// # Example
///
/// ```
/// use glam::Vec3;
/// use lidarkit_3d::io::ply::{encode_ply, PlyFormat};
/// use lidarkit_3d::pointcloud::{Point, PointCloud};
///
/// let cloud = PointCloud::from_points(vec![Point::new(Vec3::new(1.0, 2.0, 3.0), 1.0)]);
/// let bytes = encode_ply(&cloud, PlyFormat::Ascii).unwrap();
/// let text = String::from_utf8(bytes).unwrap();
/// assert!(text.ends_with("1.000000 2.000000 3.000000 0.000000 0.000000 0.000000 1.000000 255 255 255 255\n"));
/// ```
pub fn encode_ply(cloud: &PointCloud, format: PlyFormat) -> Result<Vec<u8>, PlyError> {
    let header = ply_header(format, cloud.len());

    let output = match format {
        PlyFormat::Ascii => {
            let mut text = header;
            for point in cloud.points() {
                write_ascii_record(&mut text, &PlyVertex::from(point));
            }
            text.into_bytes()
        }
        PlyFormat::BinaryLittleEndian => {
            let mut bytes = Vec::with_capacity(
                header.len() + cloud.len() * super::PLY_VERTEX_SIZE,
            );
            bytes.extend_from_slice(header.as_bytes());
            let config = PlyVertex::config();
            for point in cloud.points() {
                bincode::encode_into_std_write(PlyVertex::from(point), &mut bytes, config)?;
            }
            bytes
        }
    };

    Ok(output)
}

/// Write a point cloud to a PLY file.
pub fn write_ply(
    cloud: &PointCloud,
    format: PlyFormat,
    path: impl AsRef<Path>,
) -> Result<(), PlyError> {
    let bytes = encode_ply(cloud, format)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

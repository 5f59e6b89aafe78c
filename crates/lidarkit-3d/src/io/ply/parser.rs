use std::io::{BufRead, Read};
use std::path::Path;

use super::{
    properties::{is_vertex_layout, PlyDataType, PlyPropertyDefinition, PlyVertex},
    PlyError, PlyFormat, PLY_VERTEX_SIZE,
};
use crate::pointcloud::{Point, PointCloud};

/// Upper bound on the vertices reserved up front; the header count is untrusted.
const MAX_PREALLOCATED_VERTICES: usize = 1 << 16;

struct PlyHeader {
    pub vertex_count: usize,
    pub format: PlyFormat,
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, PlyError> {
    let mut line = String::new();
    let mut vertex_count = None;
    let mut format = None;
    let mut properties = Vec::new();

    if reader.read_line(&mut line)? == 0 || line.trim() != "ply" {
        return Err(PlyError::MalformedHeader("missing ply magic".to_string()));
    }

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PlyError::MalformedHeader("missing end_header".to_string()));
        }
        let trimmed = line.trim();
        let parts: Vec<&str> = trimmed.split_whitespace().collect();

        match parts.as_slice() {
            ["end_header"] => break,
            [] | ["comment", ..] | ["obj_info", ..] => continue,
            ["format", keyword, "1.0"] => {
                format = Some(PlyFormat::from_keyword(keyword).ok_or_else(|| {
                    PlyError::MalformedHeader(format!("unsupported format {keyword}"))
                })?);
            }
            ["element", "vertex", count] => {
                vertex_count = Some(count.parse::<usize>().map_err(|_| {
                    PlyError::MalformedHeader(format!("invalid vertex count {count}"))
                })?);
            }
            ["property", data_type, name] => {
                let data_type =
                    PlyDataType::parse(data_type).ok_or(PlyError::UnsupportedProperty)?;
                properties.push(PlyPropertyDefinition {
                    name: name.to_string(),
                    data_type,
                });
            }
            _ => {
                return Err(PlyError::MalformedHeader(format!(
                    "unexpected header line: {trimmed}"
                )))
            }
        }
    }

    let format =
        format.ok_or_else(|| PlyError::MalformedHeader("missing format line".to_string()))?;
    let vertex_count = vertex_count
        .ok_or_else(|| PlyError::MalformedHeader("missing vertex element".to_string()))?;

    if !is_vertex_layout(&properties) {
        return Err(PlyError::UnsupportedProperty);
    }

    Ok(PlyHeader {
        vertex_count,
        format,
    })
}

fn read_binary_vertices<R: Read>(
    reader: &mut R,
    vertex_count: usize,
) -> Result<Vec<Point>, PlyError> {
    let mut buffer = [0u8; PLY_VERTEX_SIZE];
    let mut points = Vec::with_capacity(vertex_count.min(MAX_PREALLOCATED_VERTICES));
    let config = PlyVertex::config();

    for read in 0..vertex_count {
        if let Err(e) = reader.read_exact(&mut buffer) {
            return Err(match e.kind() {
                std::io::ErrorKind::UnexpectedEof => PlyError::UnexpectedEndOfData {
                    expected: vertex_count,
                    read,
                },
                _ => e.into(),
            });
        }
        let (vertex, _): (PlyVertex, usize) = bincode::decode_from_slice(&buffer, config)?;
        points.push(vertex.into());
    }

    Ok(points)
}

fn parse_ascii_vertex(line: &str, index: usize) -> Result<PlyVertex, PlyError> {
    let invalid = || PlyError::InvalidAsciiRecord(index);
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 11 {
        return Err(invalid());
    }

    let mut floats = [0f32; 7];
    for (value, field) in floats.iter_mut().zip(&fields[..7]) {
        *value = field.parse().map_err(|_| invalid())?;
    }
    let mut bytes = [0u8; 4];
    for (value, field) in bytes.iter_mut().zip(&fields[7..]) {
        *value = field.parse().map_err(|_| invalid())?;
    }

    Ok(PlyVertex {
        x: floats[0],
        y: floats[1],
        z: floats[2],
        nx: floats[3],
        ny: floats[4],
        nz: floats[5],
        confidence: floats[6],
        red: bytes[0],
        green: bytes[1],
        blue: bytes[2],
        alpha: bytes[3],
    })
}

fn read_ascii_vertices<R: BufRead>(
    reader: &mut R,
    vertex_count: usize,
) -> Result<Vec<Point>, PlyError> {
    let mut points = Vec::with_capacity(vertex_count.min(MAX_PREALLOCATED_VERTICES));
    let mut line = String::new();

    while points.len() < vertex_count {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PlyError::UnexpectedEndOfData {
                expected: vertex_count,
                read: points.len(),
            });
        }
        if line.trim().is_empty() {
            continue;
        }
        points.push(parse_ascii_vertex(&line, points.len())?.into());
    }

    Ok(points)
}

/// Read a point cloud in the layout written by [`super::encode_ply`] from a reader.
///
/// Both the ASCII and the binary little endian encodings are accepted. The
/// header must declare exactly the vertex properties the writer emits.
pub fn read_ply_from<R: BufRead>(reader: &mut R) -> Result<PointCloud, PlyError> {
    let header = parse_header(reader)?;

    let points = match header.format {
        PlyFormat::Ascii => read_ascii_vertices(reader, header.vertex_count)?,
        PlyFormat::BinaryLittleEndian => read_binary_vertices(reader, header.vertex_count)?,
    };

    log::debug!(
        "Read {} vertices from {} PLY data",
        points.len(),
        header.format.keyword()
    );

    Ok(PointCloud::from_points(points))
}

/// Decode a point cloud from PLY bytes.
///
/// The decoded cloud has no metadata, an identity transform and the current
/// time as timestamp; those are not stored in PLY.
pub fn decode_ply(bytes: &[u8]) -> Result<PointCloud, PlyError> {
    let mut reader = bytes;
    read_ply_from(&mut reader)
}

/// Read a PLY file written by [`super::write_ply`].
pub fn read_ply(path: impl AsRef<Path>) -> Result<PointCloud, PlyError> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    read_ply_from(&mut reader)
}

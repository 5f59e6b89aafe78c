use glam::Vec3;

use crate::pointcloud::Point;

/// Size in bytes of one binary vertex record.
pub const PLY_VERTEX_SIZE: usize = 7 * 4 + 4;

/// Color written for points without one.
pub const DEFAULT_COLOR: [u8; 4] = [255, 255, 255, 255];

/// Scalar types used by the vertex properties.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PlyDataType {
    /// 32 bit float, `float` in the header.
    Float32,
    /// Unsigned byte, `uchar` in the header.
    UInt8,
}

impl PlyDataType {
    /// The keyword written on `property` header lines.
    pub fn keyword(&self) -> &'static str {
        match self {
            PlyDataType::Float32 => "float",
            PlyDataType::UInt8 => "uchar",
        }
    }

    pub(crate) fn parse(type_str: &str) -> Option<Self> {
        match type_str {
            "float" | "float32" => Some(PlyDataType::Float32),
            "uchar" | "uint8" => Some(PlyDataType::UInt8),
            _ => None,
        }
    }
}

/// A `property` line of the header.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyPropertyDefinition {
    /// Property name.
    pub name: String,
    /// Property scalar type.
    pub data_type: PlyDataType,
}

/// The vertex properties, in record order.
pub const VERTEX_PROPERTIES: [(&str, PlyDataType); 11] = [
    ("x", PlyDataType::Float32),
    ("y", PlyDataType::Float32),
    ("z", PlyDataType::Float32),
    ("nx", PlyDataType::Float32),
    ("ny", PlyDataType::Float32),
    ("nz", PlyDataType::Float32),
    ("confidence", PlyDataType::Float32),
    ("red", PlyDataType::UInt8),
    ("green", PlyDataType::UInt8),
    ("blue", PlyDataType::UInt8),
    ("alpha", PlyDataType::UInt8),
];

pub(crate) fn is_vertex_layout(properties: &[PlyPropertyDefinition]) -> bool {
    properties.len() == VERTEX_PROPERTIES.len()
        && properties
            .iter()
            .zip(VERTEX_PROPERTIES.iter())
            .all(|(p, (name, data_type))| p.name == *name && p.data_type == *data_type)
}

/// One vertex record as laid out in the file.
#[derive(Debug, Clone, Copy, PartialEq, bincode::Encode, bincode::Decode)]
pub struct PlyVertex {
    /// Position x.
    pub x: f32,
    /// Position y.
    pub y: f32,
    /// Position z.
    pub z: f32,
    /// Normal x, zero when absent.
    pub nx: f32,
    /// Normal y, zero when absent.
    pub ny: f32,
    /// Normal z, zero when absent.
    pub nz: f32,
    /// Sensor confidence.
    pub confidence: f32,
    /// Red channel, 255 when absent.
    pub red: u8,
    /// Green channel, 255 when absent.
    pub green: u8,
    /// Blue channel, 255 when absent.
    pub blue: u8,
    /// Alpha channel, 255 when absent.
    pub alpha: u8,
}

impl PlyVertex {
    pub(crate) fn config() -> impl bincode::config::Config {
        bincode::config::standard()
            .with_little_endian()
            .with_fixed_int_encoding()
    }
}

impl From<&Point> for PlyVertex {
    fn from(point: &Point) -> Self {
        let normal = point.normal.unwrap_or(Vec3::ZERO);
        let [red, green, blue, alpha] = point.color.unwrap_or(DEFAULT_COLOR);
        Self {
            x: point.position.x,
            y: point.position.y,
            z: point.position.z,
            nx: normal.x,
            ny: normal.y,
            nz: normal.z,
            confidence: point.confidence,
            red,
            green,
            blue,
            alpha,
        }
    }
}

impl From<PlyVertex> for Point {
    fn from(vertex: PlyVertex) -> Self {
        let normal = Vec3::new(vertex.nx, vertex.ny, vertex.nz);
        Point {
            position: Vec3::new(vertex.x, vertex.y, vertex.z),
            // a zero normal is what the writer emits for points without one
            normal: (normal != Vec3::ZERO).then_some(normal),
            confidence: vertex.confidence,
            color: Some([vertex.red, vertex.green, vertex.blue, vertex.alpha]),
            intensity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_from_point_defaults() {
        let point = Point::new(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let vertex = PlyVertex::from(&point);
        assert_eq!((vertex.nx, vertex.ny, vertex.nz), (0.0, 0.0, 0.0));
        assert_eq!(
            [vertex.red, vertex.green, vertex.blue, vertex.alpha],
            DEFAULT_COLOR
        );

        let back = Point::from(vertex);
        assert_eq!(back.position, point.position);
        assert_eq!(back.normal, None);
        assert_eq!(back.color, Some(DEFAULT_COLOR));
    }

    #[test]
    fn test_vertex_record_size() -> Result<(), bincode::error::EncodeError> {
        let vertex = PlyVertex::from(&Point::new(Vec3::ONE, 1.0));
        let bytes = bincode::encode_to_vec(vertex, PlyVertex::config())?;
        assert_eq!(bytes.len(), PLY_VERTEX_SIZE);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[28..32], &[255, 255, 255, 255]);
        Ok(())
    }

    #[test]
    fn test_vertex_layout_detection() {
        let mut properties = VERTEX_PROPERTIES
            .iter()
            .map(|(name, data_type)| PlyPropertyDefinition {
                name: name.to_string(),
                data_type: *data_type,
            })
            .collect::<Vec<_>>();
        assert!(is_vertex_layout(&properties));

        properties.swap(0, 1);
        assert!(!is_vertex_layout(&properties));

        properties.truncate(3);
        assert!(!is_vertex_layout(&properties));
    }
}

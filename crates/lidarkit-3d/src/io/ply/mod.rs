mod exporter;
mod parser;
mod properties;
mod writer;

pub use exporter::*;
pub use parser::*;
pub use properties::*;
pub use writer::*;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read or write a PLY file
    #[error("Failed to read or write PLY file. {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize a binary vertex record
    #[error("Failed to serialize PLY vertex. {0}")]
    Serialize(#[from] bincode::error::EncodeError),

    /// Failed to deserialize a binary vertex record
    #[error("Failed to deserialize PLY vertex. {0}")]
    Deserialize(#[from] bincode::error::DecodeError),

    /// Malformed PLY header
    #[error("Malformed PLY header: {0}")]
    MalformedHeader(String),

    /// Unsupported PLY property layout
    #[error("Unsupported PLY property layout")]
    UnsupportedProperty,

    /// The body holds fewer vertices than the header announces
    #[error("PLY body ended after {read} of {expected} vertices")]
    UnexpectedEndOfData {
        /// Vertex count announced by the header.
        expected: usize,
        /// Vertices read before the body ended.
        read: usize,
    },

    /// An ASCII vertex line could not be parsed
    #[error("Invalid ASCII vertex record at vertex {0}")]
    InvalidAsciiRecord(usize),
}

/// Encoding of the vertex records that follow the PLY header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlyFormat {
    /// One text line per vertex.
    Ascii,
    /// Fixed width little endian records.
    #[default]
    BinaryLittleEndian,
}

impl PlyFormat {
    /// The keyword used on the `format` header line.
    pub fn keyword(&self) -> &'static str {
        match self {
            PlyFormat::Ascii => "ascii",
            PlyFormat::BinaryLittleEndian => "binary_little_endian",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "ascii" => Some(PlyFormat::Ascii),
            "binary_little_endian" => Some(PlyFormat::BinaryLittleEndian),
            _ => None,
        }
    }
}

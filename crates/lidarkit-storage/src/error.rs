/// Errors returned by point cloud stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The identifier cannot be used as a file stem
    #[error("Invalid point cloud identifier: {0:?}")]
    InvalidIdentifier(String),

    /// No point cloud is stored under the identifier
    #[error("No point cloud stored under {0:?}")]
    FileNotFound(String),

    /// The stored files are corrupt or disagree with each other
    #[error("Invalid stored point cloud data: {0}")]
    InvalidData(String),

    /// Failed to access the store directory
    #[error("Failed to access point cloud store. {0}")]
    Io(#[from] std::io::Error),
}

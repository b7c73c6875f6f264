use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, AsarError>;

/// Unified error type for pack and unpack
#[derive(Debug, Error)]
pub enum AsarError {
    // Filesystem errors
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] io::Error),

    #[error("File {} is {} bytes, above the 4 GiB per-file limit", .path.display(), .size)]
    SizeLimitExceeded { path: PathBuf, size: u64 },

    // Archive errors
    #[error("Invalid archive header: {0}")]
    Header(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("Path error: {0}")]
    Path(String),
}

impl From<walkdir::Error> for AsarError {
    fn from(err: walkdir::Error) -> Self {
        let msg = err.to_string();
        let io = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, msg));
        AsarError::Filesystem(io)
    }
}

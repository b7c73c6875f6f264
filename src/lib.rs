//! asar-rs: pack directory trees into ASAR archives and unpack them
//!
//! An archive is a 16-byte preamble, a zero-padded JSON description of the
//! directory tree, and the raw bytes of every file concatenated in the order
//! the tree was walked. Each file entry records its offset into that data
//! region and its size.
//!
//! # Example
//!
//! ```no_run
//! use asar_rs::{pack, unpack, ArchiveReader};
//!
//! pack("app", "app.asar")?;
//!
//! let reader = ArchiveReader::open("app.asar")?;
//! let main_js = reader.read_file("src/main.js")?;
//! println!("{} bytes", main_js.len());
//!
//! unpack("app.asar", "app-restored")?;
//! # Ok::<(), asar_rs::AsarError>(())
//! ```

pub mod archive;
pub mod error;

use std::path::Path;
use tracing::info;

// Re-export commonly used types
pub use archive::{
    ArchiveReader, ArchiveWriter, Directory, Entry, FileEntry, Offset, FORMAT_MARKER,
    MAX_FILE_SIZE, PREAMBLE_SIZE,
};
pub use error::{AsarError, Result};

/// Pack the directory at `src` into a new archive at `dest`
///
/// `dest` is truncated if it exists. A failure while writing leaves a
/// partial archive behind.
pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dest: Q) -> Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    info!(source = %src.display(), archive = %dest.display(), "packing");

    let mut writer = ArchiveWriter::new(dest);
    writer.add_dir_all(src)?;
    writer.finalize()
}

/// Extract the archive at `src` into the directory `dest`
///
/// `dest` and its parents are created when missing. Files already present
/// are overwritten; nothing is cleaned up on failure.
pub fn unpack<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dest: Q) -> Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    info!(archive = %src.display(), destination = %dest.display(), "unpacking");

    ArchiveReader::open(src)?.extract_all(dest)
}

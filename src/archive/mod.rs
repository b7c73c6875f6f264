mod entry;
mod format;
mod reader;
mod writer;

pub use entry::{split_path, validate_name, Directory, Entry, FileEntry, Offset};
pub use format::{
    align4, decode, encode, read_from, read_u32, write_u32, Preamble, FORMAT_MARKER,
    MAX_FILE_SIZE, PREAMBLE_SIZE,
};
pub use reader::ArchiveReader;
pub use writer::{check_file_size, ArchiveWriter};

use crate::archive::entry::{split_path, Directory, Entry, FileEntry};
use crate::archive::format::{self, MAX_FILE_SIZE};
use crate::error::{AsarError, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Fail with `SizeLimitExceeded` when `size` cannot be addressed by the format
pub fn check_file_size(path: &Path, size: u64) -> Result<()> {
    if size > MAX_FILE_SIZE {
        return Err(AsarError::SizeLimitExceeded {
            path: path.to_path_buf(),
            size,
        });
    }
    Ok(())
}

/// Path of `file_path` relative to `root`, joined with forward slashes
fn relative_name(root: &Path, file_path: &Path) -> Result<String> {
    let rel = file_path.strip_prefix(root).map_err(|_| {
        AsarError::Path(format!(
            "{} is outside {}",
            file_path.display(),
            root.display()
        ))
    })?;

    let mut out = String::new();
    for (i, comp) in rel.components().enumerate() {
        let name = comp.as_os_str().to_str().ok_or_else(|| {
            AsarError::Path(format!("Non UTF-8 name in {}", file_path.display()))
        })?;
        if i != 0 {
            out.push('/');
        }
        out.push_str(name);
    }
    Ok(out)
}

/// Archive writer for creating .asar files
///
/// Offsets are handed out as files are added. `finalize` writes the header
/// and then appends file contents in that same order.
pub struct ArchiveWriter {
    path: PathBuf,
    root: Directory,
    pending: Vec<(PathBuf, u64)>,
    current_offset: u64,
    follow_links: bool,
}

impl ArchiveWriter {
    /// Prepare a writer targeting `path`; nothing is created until `finalize`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            root: Directory::new(),
            pending: Vec::new(),
            current_offset: 0,
            follow_links: true,
        }
    }

    /// Follow symlinks while walking directories (default: true)
    ///
    /// When disabled, symlinks are skipped.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Entry tree built so far
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Total bytes the data region will hold
    pub fn data_size(&self) -> u64 {
        self.current_offset
    }

    /// Add a directory (and any missing parents)
    pub fn add_dir(&mut self, archive_path: &str) -> Result<()> {
        let components = split_path(archive_path)?;
        self.root.ensure_dir(&components)?;
        Ok(())
    }

    /// Add a file from disk at `archive_path`
    pub fn add_file_from_disk(&mut self, archive_path: &str, disk_path: &Path) -> Result<()> {
        let size = fs::metadata(disk_path)?.len();
        self.add_sized_file(archive_path, disk_path, size)
    }

    fn add_sized_file(&mut self, archive_path: &str, disk_path: &Path, size: u64) -> Result<()> {
        check_file_size(disk_path, size)?;

        let components = split_path(archive_path)?;
        let (name, parents) = components
            .split_last()
            .ok_or_else(|| AsarError::Path(format!("Empty archive path: {:?}", archive_path)))?;

        let dir = self.root.ensure_dir(parents)?;
        if dir.files.contains_key(*name) {
            return Err(AsarError::Path(format!(
                "{} already exists in archive",
                archive_path
            )));
        }

        let offset = self.current_offset;
        dir.files
            .insert((*name).to_string(), Entry::File(FileEntry::new(offset, size)));
        self.pending.push((disk_path.to_path_buf(), size));
        self.current_offset += size;

        debug!(path = archive_path, offset, size, "assigned offset");
        Ok(())
    }

    /// Add every file and directory under `src`, sorted by name at each level
    pub fn add_dir_all<P: AsRef<Path>>(&mut self, src: P) -> Result<()> {
        let src = src.as_ref();
        if !fs::metadata(src)?.is_dir() {
            return Err(AsarError::Path(format!("{} is not a directory", src.display())));
        }

        let walker = WalkDir::new(src)
            .min_depth(1)
            .follow_links(self.follow_links)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry?;
            let rel = relative_name(src, entry.path())?;
            let file_type = entry.file_type();

            if file_type.is_dir() {
                self.add_dir(&rel)?;
            } else if file_type.is_file() {
                let size = entry.metadata()?.len();
                self.add_sized_file(&rel, entry.path(), size)?;
            } else {
                warn!(path = %entry.path().display(), "skipping entry that is neither file nor directory");
            }
        }
        Ok(())
    }

    /// Write the header and the data region
    pub fn finalize(self) -> Result<()> {
        let header = format::encode(&self.root)?;

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&header)?;

        for (disk_path, size) in &self.pending {
            let source = File::open(disk_path)?;
            // Cap at the recorded size so later offsets stay valid
            let copied = io::copy(&mut source.take(*size), &mut writer)?;
            if copied != *size {
                return Err(AsarError::Filesystem(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "{} shrank while packing: expected {} bytes, read {}",
                        disk_path.display(),
                        size,
                        copied
                    ),
                )));
            }
        }

        writer.flush()?;

        info!(
            archive = %self.path.display(),
            files = self.pending.len(),
            header_bytes = header.len(),
            data_bytes = self.current_offset,
            "archive written"
        );
        Ok(())
    }
}

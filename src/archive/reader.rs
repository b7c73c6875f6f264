use crate::archive::entry::{validate_name, Directory, Entry, FileEntry};
use crate::archive::format;
use crate::error::{AsarError, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info};

/// Archive reader over an open .asar file
pub struct ArchiveReader {
    file: File,
    archive_len: u64,
    data_offset: u64,
    root: Directory,
}

impl ArchiveReader {
    /// Open an archive and decode its header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let archive_len = file.metadata()?.len();

        let (data_offset, root) = format::read_from(BufReader::new(&file))?;

        Ok(Self {
            file,
            archive_len,
            data_offset,
            root,
        })
    }

    /// Absolute position of the data region
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    pub fn archive_len(&self) -> u64 {
        self.archive_len
    }

    /// Root of the decoded entry tree
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Number of file entries in archive
    pub fn file_count(&self) -> usize {
        self.root.file_count()
    }

    /// List every file and directory path in pre-order
    pub fn list_files(&self) -> Vec<String> {
        self.root
            .entries()
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.root.get(path).is_some()
    }

    /// Get entry information without reading data
    pub fn get_entry(&self, path: &str) -> Option<&Entry> {
        self.root.get(path)
    }

    /// Read a single file's contents into memory
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let entry = self
            .root
            .get(path)
            .ok_or_else(|| AsarError::EntryNotFound(path.to_string()))?;
        let file = entry
            .as_file()
            .ok_or_else(|| AsarError::Path(format!("{} is a directory", path)))?;

        let mut data = Vec::new();
        self.copy_entry(path, file, &mut data)?;
        Ok(data)
    }

    /// Recreate the whole tree under `dest`
    pub fn extract_all<P: AsRef<Path>>(&self, dest: P) -> Result<()> {
        let dest = dest.as_ref();
        fs::create_dir_all(dest)?;
        self.extract_dir(&self.root, dest, "")?;

        info!(
            destination = %dest.display(),
            files = self.file_count(),
            "archive extracted"
        );
        Ok(())
    }

    fn extract_dir(&self, dir: &Directory, target: &Path, prefix: &str) -> Result<()> {
        for (name, entry) in &dir.files {
            validate_name(name)
                .map_err(|_| AsarError::Extraction(format!("Unsafe entry name {:?}", name)))?;

            let path = target.join(name);
            let rel = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", prefix, name)
            };

            match entry {
                Entry::Directory(sub) => {
                    fs::create_dir_all(&path)?;
                    self.extract_dir(sub, &path, &rel)?;
                }
                Entry::File(file) => self.extract_file(&rel, file, &path)?,
            }
        }
        Ok(())
    }

    fn extract_file(&self, rel: &str, entry: &FileEntry, target: &Path) -> Result<()> {
        // Bounds are checked before the target file is created
        self.locate(rel, entry)?;

        let mut out = BufWriter::new(File::create(target)?);
        self.copy_entry(rel, entry, &mut out)?;
        out.flush()?;

        #[cfg(unix)]
        if entry.executable == Some(true) {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(target, fs::Permissions::from_mode(0o755))?;
        }

        debug!(path = rel, size = entry.size, "extracted file");
        Ok(())
    }

    /// Absolute start of `entry`'s bytes, bounds-checked against the archive
    fn locate(&self, rel: &str, entry: &FileEntry) -> Result<u64> {
        let offset = entry.offset.get()?;
        let start = self.data_offset.checked_add(offset);
        let end = start.and_then(|start| start.checked_add(entry.size));

        match (start, end) {
            (Some(start), Some(end)) if end <= self.archive_len => Ok(start),
            _ => Err(AsarError::Extraction(format!(
                "{}: offset {} + size {} runs past the end of the archive ({} bytes)",
                rel,
                entry.offset.as_str(),
                entry.size,
                self.archive_len
            ))),
        }
    }

    /// Stream exactly `entry.size` bytes into `out`
    fn copy_entry<W: Write>(&self, rel: &str, entry: &FileEntry, out: &mut W) -> Result<u64> {
        let start = self.locate(rel, entry)?;

        let mut file = &self.file;
        file.seek(SeekFrom::Start(start))?;
        let copied = io::copy(&mut file.take(entry.size), out)?;
        if copied != entry.size {
            return Err(AsarError::Extraction(format!(
                "{}: expected {} bytes, read {}",
                rel, entry.size, copied
            )));
        }
        Ok(copied)
    }
}

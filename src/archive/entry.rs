use crate::error::{AsarError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node in the archive's entry tree
///
/// Serialized untagged: a directory is `{"files": {...}}`, a file is
/// `{"offset": "<decimal>", "size": <integer>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Directory(Directory),
    File(FileEntry),
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Entry::File(file) => Some(file),
            Entry::Directory(_) => None,
        }
    }

    pub fn as_dir(&self) -> Option<&Directory> {
        match self {
            Entry::Directory(dir) => Some(dir),
            Entry::File(_) => None,
        }
    }
}

/// Directory node; also the root of every archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub files: BTreeMap<String, Entry>,
}

/// File node pointing into the data region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub offset: Offset,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<bool>,
}

/// Data-region offset, stored as a decimal string in the metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offset(String);

impl Offset {
    /// Parse the stored decimal string
    pub fn get(&self) -> Result<u64> {
        self.0
            .parse::<u64>()
            .map_err(|e| AsarError::Extraction(format!("Malformed offset {:?}: {}", self.0, e)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Offset(value.to_string())
    }
}

impl From<&str> for Offset {
    fn from(value: &str) -> Self {
        Offset(value.to_string())
    }
}

impl FileEntry {
    pub fn new(offset: u64, size: u64) -> Self {
        Self {
            offset: Offset::from(offset),
            size,
            executable: None,
        }
    }
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Look up a `/`-separated path relative to this directory
    pub fn get(&self, path: &str) -> Option<&Entry> {
        let components = split_path(path).ok()?;
        let (last, parents) = components.split_last()?;

        let mut current = self;
        for name in parents {
            current = current.files.get(*name)?.as_dir()?;
        }
        current.files.get(*last)
    }

    /// Walk down `components`, creating missing directories
    pub fn ensure_dir(&mut self, components: &[&str]) -> Result<&mut Directory> {
        let mut current = self;
        for name in components {
            let entry = current
                .files
                .entry((*name).to_string())
                .or_insert_with(|| Entry::Directory(Directory::new()));
            current = match entry {
                Entry::Directory(dir) => dir,
                Entry::File(_) => {
                    return Err(AsarError::Path(format!(
                        "{} already exists as a file",
                        name
                    )))
                }
            };
        }
        Ok(current)
    }

    /// All entries in pre-order, keyed by their `/`-joined relative path
    pub fn entries(&self) -> Vec<(String, &Entry)> {
        let mut out = Vec::new();
        collect_entries(self, "", &mut out);
        out
    }

    /// All file entries in pre-order, which is also pack order
    pub fn files(&self) -> Vec<(String, &FileEntry)> {
        self.entries()
            .into_iter()
            .filter_map(|(path, entry)| entry.as_file().map(|file| (path, file)))
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.files
            .values()
            .map(|entry| match entry {
                Entry::File(_) => 1,
                Entry::Directory(dir) => dir.file_count(),
            })
            .sum()
    }
}

fn collect_entries<'a>(dir: &'a Directory, prefix: &str, out: &mut Vec<(String, &'a Entry)>) {
    for (name, entry) in &dir.files {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        out.push((path.clone(), entry));
        if let Entry::Directory(sub) = entry {
            collect_entries(sub, &path, out);
        }
    }
}

/// Check that `name` is usable as a single path component
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(AsarError::Path(format!("Invalid entry name: {:?}", name)));
    }
    Ok(())
}

/// Split an archive path into validated components
///
/// Backslashes are treated as separators and leading separators are ignored.
pub fn split_path(path: &str) -> Result<Vec<&str>> {
    let trimmed = path.trim_start_matches(['/', '\\']);
    if trimmed.is_empty() {
        return Err(AsarError::Path(format!("Empty archive path: {:?}", path)));
    }

    let components: Vec<&str> = trimmed.split(['/', '\\']).collect();
    for name in &components {
        validate_name(name)?;
    }
    Ok(components)
}

//! Fingerprinted file models

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Hex SHA-1 digest of a file's exact bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Compute the digest of `data`
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the bytes of an input file come from
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// One logical file handed to a deployment session
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub source: FileSource,
}

impl FileInput {
    /// A file on disk, named by its path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.to_string_lossy().into_owned(),
            source: FileSource::Path(path),
        }
    }

    /// In-memory contents under a logical name
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Bytes(data.into()),
        }
    }
}

/// Unique content shared by one or more logical paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    fingerprint: ContentHash,
    names: Vec<String>,
    data: Bytes,
    size: u64,
}

impl FileEntry {
    pub(crate) fn new(fingerprint: ContentHash, name: String, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            fingerprint,
            names: vec![name],
            data: Bytes::from(data),
            size,
        }
    }

    pub(crate) fn push_name(&mut self, name: String) {
        self.names.push(name);
    }

    pub fn fingerprint(&self) -> &ContentHash {
        &self.fingerprint
    }

    /// Logical paths in encounter order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the contents, no copy
    pub fn content(&self) -> Bytes {
        self.data.clone()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Fingerprint to entry mapping, iterated in first-encounter order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: Vec<Arc<FileEntry>>,
    index: HashMap<ContentHash, usize>,
}

impl FileSet {
    pub(crate) fn from_entries(entries: Vec<FileEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.fingerprint.clone(), i))
            .collect();

        Self {
            entries: entries.into_iter().map(Arc::new).collect(),
            index,
        }
    }

    pub fn get(&self, fingerprint: &ContentHash) -> Option<&Arc<FileEntry>> {
        self.index.get(fingerprint).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FileEntry>> {
        self.entries.iter()
    }

    pub fn first(&self) -> Option<&Arc<FileEntry>> {
        self.entries.first()
    }

    /// Number of unique fingerprints
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of logical paths across all entries
    pub fn total_files(&self) -> usize {
        self.entries.iter().map(|e| e.names.len()).sum()
    }

    /// Bytes of unique content
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

//! Content fingerprinting

use std::collections::HashMap;

use tracing::debug;

use crate::errors::DeploymentError;
use crate::filesys::file::File;
use crate::models::file::{ContentHash, FileEntry, FileInput, FileSet, FileSource};

/// Hash every input and group logical paths sharing identical bytes.
///
/// Each source is read exactly once. Entries keep first-encounter order and
/// merged names keep input order. The first unreadable source aborts the
/// whole operation.
pub async fn fingerprint_files(
    inputs: impl IntoIterator<Item = FileInput>,
) -> Result<FileSet, DeploymentError> {
    let mut entries: Vec<FileEntry> = Vec::new();
    let mut index: HashMap<ContentHash, usize> = HashMap::new();

    for input in inputs {
        let data = match input.source {
            FileSource::Path(path) => File::new(path).read_bytes().await?,
            FileSource::Bytes(data) => data,
        };

        let fingerprint = ContentHash::of(&data);
        match index.get(&fingerprint) {
            Some(&i) => {
                debug!("{} duplicates {}", input.name, entries[i].names()[0]);
                entries[i].push_name(input.name);
            }
            None => {
                index.insert(fingerprint.clone(), entries.len());
                entries.push(FileEntry::new(fingerprint, input.name, data));
            }
        }
    }

    let files = FileSet::from_entries(entries);
    debug!(
        "Hashed {} files into {} unique entries ({} bytes)",
        files.total_files(),
        files.len(),
        files.total_bytes()
    );

    Ok(files)
}

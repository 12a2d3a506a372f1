//! File operations

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::errors::DeploymentError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read the whole file. The handle is closed before returning.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, DeploymentError> {
        let read = async {
            let mut file = fs::File::open(&self.path).await?;
            let mut contents = Vec::new();
            file.read_to_end(&mut contents).await?;
            Ok::<_, std::io::Error>(contents)
        };

        read.await.map_err(|source| DeploymentError::Read {
            path: self.path.clone(),
            source,
        })
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, DeploymentError> {
        let contents = self.read_bytes().await?;
        let value = serde_json::from_slice(&contents)?;
        Ok(value)
    }
}

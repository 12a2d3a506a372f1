//! Concurrent content upload

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, error, info};

use crate::errors::DeploymentError;
use crate::events::{EventSink, LifecycleEvent};
use crate::http::api::DeploymentApi;
use crate::models::file::{ContentHash, FileEntry, FileSet};
use crate::utils::{retry, RetryOptions};

/// Upload status of one fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadStatus {
    Pending,
    Uploading,
    Done,
    Failed,
}

/// Per-fingerprint bookkeeping, alive while its upload chain runs
#[derive(Debug)]
struct UploadTask {
    fingerprint: ContentHash,
    attempts: u32,
    status: UploadStatus,
}

impl UploadTask {
    fn new(fingerprint: ContentHash) -> Self {
        Self {
            fingerprint,
            attempts: 0,
            status: UploadStatus::Pending,
        }
    }
}

/// Uploads every unique fingerprint of a file set
pub struct Uploader {
    api: Arc<dyn DeploymentApi>,
    retry: RetryOptions,
}

impl Uploader {
    pub fn new(api: Arc<dyn DeploymentApi>, retry: RetryOptions) -> Self {
        Self { api, retry }
    }

    /// Upload all entries at once and report each as it finishes.
    ///
    /// Emits one `file-uploaded` per fingerprint and a final `all-files-uploaded`
    /// only when every upload succeeded. The first permanent failure drops the
    /// remaining in-flight uploads and is returned.
    pub async fn upload_all(
        &self,
        files: &FileSet,
        events: &EventSink,
    ) -> Result<(), DeploymentError> {
        info!("Uploading {} files ({} bytes)", files.len(), files.total_bytes());

        let mut pending: FuturesUnordered<_> = files
            .iter()
            .map(|entry| self.upload_one(entry.clone()))
            .collect();

        while let Some(result) = pending.next().await {
            let entry = result?;
            events.emit(LifecycleEvent::FileUploaded(entry)).await?;
        }

        info!("All files uploaded");
        events.emit(LifecycleEvent::AllFilesUploaded).await
    }

    async fn upload_one(&self, entry: Arc<FileEntry>) -> Result<Arc<FileEntry>, DeploymentError> {
        let mut task = UploadTask::new(entry.fingerprint().clone());
        let label = format!("Upload of {}", entry.names()[0]);

        let result = retry(&self.retry, &label, |attempt| {
            task.attempts = attempt;
            task.status = UploadStatus::Uploading;
            debug!(sha = %task.fingerprint, attempt, "uploading {} bytes", entry.size());

            let api = self.api.clone();
            let entry = entry.clone();
            async move { api.put_content(entry.fingerprint(), entry.content()).await }
        })
        .await;

        match result {
            Ok(()) => {
                task.status = UploadStatus::Done;
                debug!(sha = %task.fingerprint, attempts = task.attempts, status = ?task.status, "upload finished");
                Ok(entry)
            }
            Err(e) => {
                task.status = UploadStatus::Failed;
                error!(sha = %task.fingerprint, attempts = task.attempts, status = ?task.status, "upload failed: {}", e);
                Err(e)
            }
        }
    }
}

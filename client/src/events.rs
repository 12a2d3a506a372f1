//! Lifecycle events surfaced to the caller of a deployment session

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{DeploymentError, ErrorReport};
use crate::models::deployment::{Build, Deployment};
use crate::models::file::{FileEntry, FileSet};

/// Event names, as exposed on the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    HashesCalculated,
    FileUploaded,
    AllFilesUploaded,
    DefaultToStatic,
    Created,
    BuildStateChanged,
    AllBuildsCompleted,
    DeploymentStateChanged,
    Ready,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::HashesCalculated => "hashes-calculated",
            EventKind::FileUploaded => "file-uploaded",
            EventKind::AllFilesUploaded => "all-files-uploaded",
            EventKind::DefaultToStatic => "default-to-static",
            EventKind::Created => "created",
            EventKind::BuildStateChanged => "build-state-changed",
            EventKind::AllBuildsCompleted => "all-builds-completed",
            EventKind::DeploymentStateChanged => "deployment-state-changed",
            EventKind::Ready => "ready",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a deployment session. Append-only, never retracted.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    HashesCalculated(Arc<FileSet>),
    FileUploaded(Arc<FileEntry>),
    AllFilesUploaded,
    /// Metadata after the static build defaults were applied
    DefaultToStatic(serde_json::Map<String, Value>),
    Created(Deployment),
    BuildStateChanged(Build),
    AllBuildsCompleted(Vec<Build>),
    DeploymentStateChanged(Deployment),
    Ready(Deployment),
    Error(ErrorReport),
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::HashesCalculated(_) => EventKind::HashesCalculated,
            LifecycleEvent::FileUploaded(_) => EventKind::FileUploaded,
            LifecycleEvent::AllFilesUploaded => EventKind::AllFilesUploaded,
            LifecycleEvent::DefaultToStatic(_) => EventKind::DefaultToStatic,
            LifecycleEvent::Created(_) => EventKind::Created,
            LifecycleEvent::BuildStateChanged(_) => EventKind::BuildStateChanged,
            LifecycleEvent::AllBuildsCompleted(_) => EventKind::AllBuildsCompleted,
            LifecycleEvent::DeploymentStateChanged(_) => EventKind::DeploymentStateChanged,
            LifecycleEvent::Ready(_) => EventKind::Ready,
            LifecycleEvent::Error(_) => EventKind::Error,
        }
    }

    /// `ready` and `error` end the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleEvent::Ready(_) | LifecycleEvent::Error(_))
    }

    /// `{"type": ..., "payload": ...}` rendering used by the CLI
    pub fn to_json(&self) -> Value {
        let payload = match self {
            LifecycleEvent::HashesCalculated(files) => json!({
                "files": files.total_files(),
                "unique": files.len(),
                "bytes": files.total_bytes(),
            }),
            LifecycleEvent::FileUploaded(entry) => file_json(entry),
            LifecycleEvent::AllFilesUploaded => Value::Null,
            LifecycleEvent::DefaultToStatic(metadata) => Value::Object(metadata.clone()),
            LifecycleEvent::Created(d)
            | LifecycleEvent::DeploymentStateChanged(d)
            | LifecycleEvent::Ready(d) => json!(d),
            LifecycleEvent::BuildStateChanged(b) => json!(b),
            LifecycleEvent::AllBuildsCompleted(builds) => json!(builds),
            LifecycleEvent::Error(report) => json!(report),
        };

        json!({ "type": self.kind().as_str(), "payload": payload })
    }
}

fn file_json(entry: &FileEntry) -> Value {
    json!({
        "sha": entry.fingerprint(),
        "names": entry.names(),
        "size": entry.size(),
    })
}

/// Cancel-aware sending half of a session's event stream
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<LifecycleEvent>,
    cancel: CancellationToken,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<LifecycleEvent>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Create a sink and the stream the caller consumes
    pub fn channel(capacity: usize, cancel: CancellationToken) -> (Self, EventStream) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx, cancel.clone()), EventStream::new(rx, cancel))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Deliver `event`, or fail with `Cancelled` once the session was abandoned.
    ///
    /// A dropped receiver counts as abandonment and cancels the session.
    pub async fn emit(&self, event: LifecycleEvent) -> Result<(), DeploymentError> {
        if self.is_cancelled() {
            return Err(DeploymentError::Cancelled);
        }

        debug!(event = %event.kind(), "emitting lifecycle event");

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DeploymentError::Cancelled),
            sent = self.tx.send(event) => sent.map_err(|_| {
                self.cancel.cancel();
                DeploymentError::Cancelled
            }),
        }
    }
}

/// Receiving half of a session's event stream.
///
/// Once the session is cancelled nothing more is yielded, including events
/// that were already buffered.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<LifecycleEvent>,
    cancel: CancellationToken,
}

impl EventStream {
    pub fn new(rx: mpsc::Receiver<LifecycleEvent>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Next event, `None` once the stream ended or the session was cancelled
    pub async fn recv(&mut self) -> Option<LifecycleEvent> {
        let event = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.rx.recv() => event,
        };

        if self.cancel.is_cancelled() {
            self.discard();
            return None;
        }
        event
    }

    fn discard(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

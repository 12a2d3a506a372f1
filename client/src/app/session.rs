//! Deployment session: runs the pipeline and sequences its events

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::app::options::SessionOptions;
use crate::deploy::creator::DeploymentCreator;
use crate::deploy::hashes::fingerprint_files;
use crate::deploy::status::StatusTracker;
use crate::deploy::upload::Uploader;
use crate::errors::DeploymentError;
use crate::events::{EventSink, EventStream, LifecycleEvent};
use crate::http::api::DeploymentApi;
use crate::http::client::HttpClient;
use crate::models::deployment::Deployment;
use crate::models::file::FileInput;

/// A running deployment session.
///
/// Events arrive in order: `hashes-calculated`, `file-uploaded`*,
/// `all-files-uploaded`, `default-to-static`?, `created`, state changes, then
/// exactly one `ready` or `error` unless the session is cancelled first.
/// Dropping the session cancels it.
pub struct DeploymentSession {
    events: Option<EventStream>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl DeploymentSession {
    /// Start a session against the platform API described by `options.client`
    pub fn start(inputs: Vec<FileInput>, options: SessionOptions) -> Result<Self, DeploymentError> {
        validate(&inputs, &options)?;

        let client = HttpClient::new(
            &options.client.api_base_url,
            &options.token,
            options.client.request_timeout,
        )?
        .with_team_id(options.team_id.clone())
        .with_read_retry(options.client.read_retry.clone());

        Self::start_with_api(Arc::new(client), inputs, options)
    }

    /// Start a session against any `DeploymentApi` implementation.
    ///
    /// Missing inputs are reported here, before any async work is spawned.
    pub fn start_with_api(
        api: Arc<dyn DeploymentApi>,
        inputs: Vec<FileInput>,
        options: SessionOptions,
    ) -> Result<Self, DeploymentError> {
        validate(&inputs, &options)?;

        let cancel = CancellationToken::new();
        let (sink, events) = EventSink::channel(options.event_capacity.max(1), cancel.clone());

        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run(api, inputs, options, sink, task_cancel).await;
        });

        Ok(Self {
            events: Some(events),
            cancel,
            handle: Some(handle),
        })
    }

    /// Takes the event stream. Can only be called once.
    pub fn take_events(&mut self) -> Option<EventStream> {
        self.events.take()
    }

    /// Next event, `None` once the stream ended or the receiver was taken
    pub async fn next_event(&mut self) -> Option<LifecycleEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    /// Abandon the session. No further events are delivered, including ones
    /// already buffered, and in-flight requests and timers are dropped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the session task to finish
    pub async fn join(mut self) -> Result<(), DeploymentError> {
        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| DeploymentError::Unexpected(format!("session task failed: {}", e))),
            None => Ok(()),
        }
    }
}

impl Drop for DeploymentSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn validate(inputs: &[FileInput], options: &SessionOptions) -> Result<(), DeploymentError> {
    if inputs.is_empty() {
        return Err(DeploymentError::missing_path());
    }
    if options.token.is_empty() {
        return Err(DeploymentError::token_not_provided());
    }
    Ok(())
}

async fn run(
    api: Arc<dyn DeploymentApi>,
    inputs: Vec<FileInput>,
    options: SessionOptions,
    sink: EventSink,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeploymentError::Cancelled),
        outcome = pipeline(api, inputs, &options, &sink, &cancel) => outcome,
    };

    match outcome {
        Ok(deployment) => {
            info!("Deployment {} is ready", deployment.id);
            let _ = sink.emit(LifecycleEvent::Ready(deployment)).await;
        }
        Err(DeploymentError::Cancelled) => {
            info!("Deployment session cancelled");
        }
        Err(e) => {
            error!("Deployment failed: {}", e);
            let _ = sink.emit(LifecycleEvent::Error(e.report())).await;
        }
    }
}

async fn pipeline(
    api: Arc<dyn DeploymentApi>,
    inputs: Vec<FileInput>,
    options: &SessionOptions,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> Result<Deployment, DeploymentError> {
    let files = Arc::new(fingerprint_files(inputs).await?);
    sink.emit(LifecycleEvent::HashesCalculated(files.clone())).await?;

    Uploader::new(api.clone(), options.upload_retry.clone())
        .upload_all(&files, sink)
        .await?;

    let deployment = DeploymentCreator::new(api.clone())
        .create(&files, &options.manifest, sink)
        .await?;

    StatusTracker::new(api, options.polling_interval)
        .track(deployment, sink, cancel)
        .await
}

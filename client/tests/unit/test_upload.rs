//! Uploader unit tests

use std::sync::Arc;
use std::time::Duration;

use nowdeploy::deploy::hashes::fingerprint_files;
use nowdeploy::deploy::upload::Uploader;
use nowdeploy::errors::DeploymentError;
use nowdeploy::events::{EventKind, EventSink, LifecycleEvent};
use nowdeploy::models::file::{FileInput, FileSet};
use nowdeploy::utils::RetryOptions;
use tokio_util::sync::CancellationToken;

use crate::mock::{drain, kinds, MockApi, PutBehavior};

fn fast_retry() -> RetryOptions {
    RetryOptions {
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        randomize: false,
        ..Default::default()
    }
}

async fn file_set(files: &[(&str, &str)]) -> FileSet {
    let inputs = files
        .iter()
        .map(|(name, data)| FileInput::from_bytes(*name, *data));
    fingerprint_files(inputs).await.unwrap()
}

async fn upload(
    api: Arc<MockApi>,
    files: &FileSet,
) -> (Result<(), DeploymentError>, Vec<LifecycleEvent>) {
    let (sink, mut rx) = EventSink::channel(64, CancellationToken::new());
    let result = Uploader::new(api, fast_retry()).upload_all(files, &sink).await;
    drop(sink);
    (result, drain(&mut rx).await)
}

#[tokio::test(start_paused = true)]
async fn test_each_fingerprint_uploaded_once() {
    let api = Arc::new(MockApi::new());
    let files = file_set(&[("a.txt", "alpha"), ("b.txt", "beta"), ("copy/a.txt", "alpha")]).await;

    let (result, events) = upload(api.clone(), &files).await;
    result.unwrap();

    assert_eq!(api.put_count(b"alpha"), 1);
    assert_eq!(api.put_count(b"beta"), 1);
    assert_eq!(
        kinds(&events),
        [
            EventKind::FileUploaded,
            EventKind::FileUploaded,
            EventKind::AllFilesUploaded
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_completion_order_is_reported() {
    let api = Arc::new(MockApi::new());
    api.on_put(b"slow", PutBehavior::Delay(Duration::from_secs(2)));
    let files = file_set(&[("slow.txt", "slow"), ("fast.txt", "fast")]).await;

    let (result, events) = upload(api, &files).await;
    result.unwrap();

    let uploaded: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            LifecycleEvent::FileUploaded(entry) => Some(entry.names()[0].clone()),
            _ => None,
        })
        .collect();
    assert_eq!(uploaded, ["fast.txt", "slow.txt"]);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let api = Arc::new(MockApi::new());
    api.on_put(b"flaky", PutBehavior::FailTimes(2));
    let files = file_set(&[("flaky.txt", "flaky")]).await;

    let (result, events) = upload(api.clone(), &files).await;
    result.unwrap();

    assert_eq!(api.put_count(b"flaky"), 3);
    assert_eq!(
        kinds(&events),
        [EventKind::FileUploaded, EventKind::AllFilesUploaded]
    );
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_stop_after_three_attempts() {
    let api = Arc::new(MockApi::new());
    api.on_put(b"broken", PutBehavior::ServerError);
    let files = file_set(&[("broken.txt", "broken")]).await;

    let (result, events) = upload(api.clone(), &files).await;

    assert!(matches!(result, Err(DeploymentError::Server { status: 503, .. })));
    assert_eq!(api.put_count(b"broken"), 3);
    assert!(!kinds(&events).contains(&EventKind::AllFilesUploaded));
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_are_not_retried() {
    let api = Arc::new(MockApi::new());
    api.on_put(b"rejected", PutBehavior::ClientError);
    let files = file_set(&[("rejected.txt", "rejected")]).await;

    let (result, events) = upload(api.clone(), &files).await;

    let err = result.unwrap_err();
    assert_eq!(err.code(), "bad_request");
    assert_eq!(api.put_count(b"rejected"), 1);
    assert!(events.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failure_abandons_pending_uploads() {
    let api = Arc::new(MockApi::new());
    api.on_put(b"rejected", PutBehavior::ClientError);
    api.on_put(b"slow", PutBehavior::Delay(Duration::from_secs(60)));
    let files = file_set(&[("slow.txt", "slow"), ("rejected.txt", "rejected")]).await;

    let (result, events) = upload(api, &files).await;

    assert!(result.is_err());
    assert!(events.is_empty());
}

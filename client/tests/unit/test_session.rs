//! Deployment session tests

use std::sync::Arc;
use std::time::Duration;

use nowdeploy::app::options::SessionOptions;
use nowdeploy::app::session::DeploymentSession;
use nowdeploy::events::{EventKind, LifecycleEvent};
use nowdeploy::models::file::FileInput;
use nowdeploy::utils::RetryOptions;

use crate::mock::{build, deployment, kinds, MockApi, PutBehavior};

fn options() -> SessionOptions {
    SessionOptions {
        token: "abc".to_string(),
        upload_retry: RetryOptions {
            randomize: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn start(api: Arc<MockApi>, inputs: Vec<FileInput>) -> DeploymentSession {
    match DeploymentSession::start_with_api(api, inputs, options()) {
        Ok(session) => session,
        Err(e) => panic!("session failed to start: {}", e),
    }
}

async fn collect(session: &mut DeploymentSession) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    while let Some(event) = session.next_event().await {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn test_static_site_deploys() {
    let api = Arc::new(MockApi::new());
    api.push_builds(vec![build("b1", "BUILDING")]);
    api.push_builds(vec![build("b1", "READY")]);
    api.push_deployment(deployment("dpl_1", "READY"));

    let mut session = start(
        api.clone(),
        vec![FileInput::from_bytes("index.html", "<b>hi</b>\n")],
    );
    let events = collect(&mut session).await;

    assert_eq!(
        kinds(&events),
        [
            EventKind::HashesCalculated,
            EventKind::FileUploaded,
            EventKind::AllFilesUploaded,
            EventKind::DefaultToStatic,
            EventKind::Created,
            EventKind::BuildStateChanged,
            EventKind::BuildStateChanged,
            EventKind::AllBuildsCompleted,
            EventKind::DeploymentStateChanged,
            EventKind::Ready,
        ]
    );

    match &events[0] {
        LifecycleEvent::HashesCalculated(files) => {
            assert_eq!(files.len(), 1);
            assert_eq!(files.total_bytes(), 10);
        }
        other => panic!("unexpected first event {:?}", other),
    }

    {
        let requests = api.create_requests.lock().unwrap();
        assert_eq!(requests[0].metadata["name"], "index.html");
        assert_eq!(requests[0].files[0].file, "index.html");
        assert_eq!(requests[0].files[0].size, 10);
    }

    session.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure_ends_with_error() {
    let api = Arc::new(MockApi::new());
    api.on_put(b"rejected", PutBehavior::ClientError);

    let mut session = start(api.clone(), vec![FileInput::from_bytes("bad.txt", "rejected")]);
    let events = collect(&mut session).await;

    assert_eq!(kinds(&events), [EventKind::HashesCalculated, EventKind::Error]);
    match events.last() {
        Some(LifecycleEvent::Error(report)) => assert_eq!(report.code, "bad_request"),
        other => panic!("expected an error event, got {:?}", other),
    }
    assert!(api.create_requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_file_ends_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(MockApi::new());

    let mut session = start(api.clone(), vec![FileInput::from_path(dir.path().join("gone.txt"))]);
    let events = collect(&mut session).await;

    assert_eq!(kinds(&events), [EventKind::Error]);
    match &events[0] {
        LifecycleEvent::Error(report) => assert_eq!(report.code, "read_error"),
        other => panic!("expected an error event, got {:?}", other),
    }
    assert!(api.put_calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_build_ends_with_single_error() {
    let api = Arc::new(MockApi::new());
    api.push_builds(vec![build("b1", "BUILD_ERROR")]);

    let mut session = start(api, vec![FileInput::from_bytes("index.html", "hi")]);
    let events = collect(&mut session).await;

    let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    match events.last() {
        Some(LifecycleEvent::Error(report)) => assert_eq!(report.code, "build_failed"),
        other => panic!("expected an error event, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_polling_emits_nothing_more() {
    let api = Arc::new(MockApi::new());
    api.push_builds(vec![build("b1", "BUILDING")]);

    let mut session = start(api.clone(), vec![FileInput::from_bytes("index.html", "hi")]);

    loop {
        match session.next_event().await {
            Some(LifecycleEvent::BuildStateChanged(_)) => break,
            Some(_) => continue,
            None => panic!("stream ended before polling started"),
        }
    }

    session.cancel();

    let next = tokio::time::timeout(Duration::from_secs(30), session.next_event())
        .await
        .unwrap();
    assert!(next.is_none());

    let polls = api.polls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.polls(), polls);

    session.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_discards_unread_events() {
    let api = Arc::new(MockApi::new());
    api.push_builds(vec![build("b1", "BUILDING")]);

    let mut session = start(api.clone(), vec![FileInput::from_bytes("index.html", "hi")]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(api.create_requests.lock().unwrap().len(), 1);

    session.cancel();

    let mut delivered = Vec::new();
    while let Some(event) = session.next_event().await {
        delivered.push(event.kind());
    }
    assert!(delivered.is_empty(), "delivered after cancel: {:?}", delivered);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_closes_taken_stream() {
    let api = Arc::new(MockApi::new());
    api.push_builds(vec![build("b1", "BUILDING")]);

    let mut session = start(api, vec![FileInput::from_bytes("index.html", "hi")]);
    let mut events = session.take_events().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    session.cancel();

    assert!(events.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_receiver_cancels_session() {
    let api = Arc::new(MockApi::new());

    let mut session = start(api.clone(), vec![FileInput::from_bytes("index.html", "hi")]);
    drop(session.take_events());

    session.join().await.unwrap();

    assert!(api.put_calls.lock().unwrap().is_empty());
    assert!(api.create_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_parameters_are_rejected() {
    let api = Arc::new(MockApi::new());

    match DeploymentSession::start_with_api(api.clone(), Vec::new(), options()) {
        Err(e) => assert_eq!(e.code(), "missing_path"),
        Ok(_) => panic!("a session without files must not start"),
    }

    let no_token = SessionOptions {
        token: String::new(),
        ..options()
    };
    let inputs = vec![FileInput::from_bytes("index.html", "hi")];
    match DeploymentSession::start_with_api(api, inputs, no_token) {
        Err(e) => assert_eq!(e.code(), "token_not_provided"),
        Ok(_) => panic!("a session without a token must not start"),
    }
}

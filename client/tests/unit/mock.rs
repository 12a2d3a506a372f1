//! Scripted DeploymentApi for tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use nowdeploy::errors::DeploymentError;
use nowdeploy::events::{EventKind, EventStream, LifecycleEvent};
use nowdeploy::http::api::DeploymentApi;
use nowdeploy::models::deployment::{Build, CreateDeploymentRequest, Deployment, ReadyState};
use nowdeploy::models::file::ContentHash;

/// How the content store answers uploads of one fingerprint
#[derive(Debug, Clone)]
pub enum PutBehavior {
    Accept,
    Delay(Duration),
    ServerError,
    ClientError,
    /// Fail with 503 this many times, then accept
    FailTimes(u32),
}

pub struct MockApi {
    put_behavior: Mutex<HashMap<String, PutBehavior>>,
    put_attempts: Mutex<HashMap<String, u32>>,
    pub put_calls: Mutex<Vec<String>>,
    create_response: Mutex<Result<Deployment, (u16, String, String)>>,
    pub create_requests: Mutex<Vec<CreateDeploymentRequest>>,
    builds: Mutex<VecDeque<Result<Vec<Build>, u16>>>,
    deployments: Mutex<VecDeque<Result<Deployment, u16>>>,
    pub build_polls: AtomicU32,
    pub deployment_polls: AtomicU32,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            put_behavior: Mutex::new(HashMap::new()),
            put_attempts: Mutex::new(HashMap::new()),
            put_calls: Mutex::new(Vec::new()),
            create_response: Mutex::new(Ok(deployment("dpl_1", "INITIALIZING"))),
            create_requests: Mutex::new(Vec::new()),
            builds: Mutex::new(VecDeque::new()),
            deployments: Mutex::new(VecDeque::new()),
            build_polls: AtomicU32::new(0),
            deployment_polls: AtomicU32::new(0),
        }
    }

    pub fn on_put(&self, data: &[u8], behavior: PutBehavior) {
        let sha = ContentHash::of(data).to_string();
        self.put_behavior.lock().unwrap().insert(sha, behavior);
    }

    pub fn create_returns(&self, response: Result<Deployment, (u16, &str, &str)>) {
        *self.create_response.lock().unwrap() =
            response.map_err(|(s, c, m)| (s, c.to_string(), m.to_string()));
    }

    /// Queue build polls; the last one repeats
    pub fn push_builds(&self, builds: Vec<Build>) {
        self.builds.lock().unwrap().push_back(Ok(builds));
    }

    pub fn push_builds_failure(&self, status: u16) {
        self.builds.lock().unwrap().push_back(Err(status));
    }

    /// Queue deployment polls; the last one repeats
    pub fn push_deployment(&self, deployment: Deployment) {
        self.deployments.lock().unwrap().push_back(Ok(deployment));
    }

    pub fn put_count(&self, data: &[u8]) -> usize {
        let sha = ContentHash::of(data).to_string();
        self.put_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == sha)
            .count()
    }

    pub fn polls(&self) -> u32 {
        self.build_polls.load(Ordering::SeqCst) + self.deployment_polls.load(Ordering::SeqCst)
    }
}

fn next<T: Clone>(queue: &Mutex<VecDeque<Result<T, u16>>>) -> Result<T, DeploymentError> {
    let mut queue = queue.lock().unwrap();
    let item = if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    };

    match item {
        Some(Ok(value)) => Ok(value),
        Some(Err(status)) => Err(http_error(status, "poll_failed", "poll failed")),
        None => Err(DeploymentError::Unexpected("nothing scripted".to_string())),
    }
}

fn http_error(status: u16, code: &str, message: &str) -> DeploymentError {
    if status >= 500 {
        DeploymentError::Server {
            status,
            code: code.to_string(),
            message: message.to_string(),
        }
    } else {
        DeploymentError::Client {
            status,
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl DeploymentApi for MockApi {
    async fn put_content(
        &self,
        fingerprint: &ContentHash,
        data: Bytes,
    ) -> Result<(), DeploymentError> {
        let sha = fingerprint.to_string();
        assert_eq!(ContentHash::of(&data), *fingerprint);
        self.put_calls.lock().unwrap().push(sha.clone());

        let attempt = {
            let mut attempts = self.put_attempts.lock().unwrap();
            let count = attempts.entry(sha.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let behavior = self
            .put_behavior
            .lock()
            .unwrap()
            .get(&sha)
            .cloned()
            .unwrap_or(PutBehavior::Accept);

        match behavior {
            PutBehavior::Accept => Ok(()),
            PutBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            PutBehavior::ServerError => Err(http_error(503, "unavailable", "try again later")),
            PutBehavior::ClientError => Err(http_error(400, "bad_request", "invalid digest")),
            PutBehavior::FailTimes(n) if attempt <= n => {
                Err(http_error(503, "unavailable", "try again later"))
            }
            PutBehavior::FailTimes(_) => Ok(()),
        }
    }

    async fn create_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<Deployment, DeploymentError> {
        self.create_requests.lock().unwrap().push(request.clone());
        self.create_response
            .lock()
            .unwrap()
            .clone()
            .map_err(|(status, code, message)| http_error(status, &code, &message))
    }

    async fn get_deployment_builds(&self, _deployment_id: &str) -> Result<Vec<Build>, DeploymentError> {
        self.build_polls.fetch_add(1, Ordering::SeqCst);
        next(&self.builds)
    }

    async fn get_deployment(&self, _deployment_id: &str) -> Result<Deployment, DeploymentError> {
        self.deployment_polls.fetch_add(1, Ordering::SeqCst);
        next(&self.deployments)
    }
}

pub fn deployment(id: &str, state: &str) -> Deployment {
    Deployment {
        id: id.to_string(),
        ready_state: ReadyState::from(state),
        url: Some(format!("{}.now.sh", id)),
        name: None,
        owner_id: None,
        team_id: None,
        created_at: None,
    }
}

pub fn build(id: &str, state: &str) -> Build {
    Build {
        id: id.to_string(),
        ready_state: ReadyState::from(state),
        entrypoint: None,
        builder: Some("@now/static".to_string()),
    }
}

/// Drain every event currently queued or still to come
pub async fn drain(rx: &mut EventStream) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

pub fn kinds(events: &[LifecycleEvent]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind()).collect()
}

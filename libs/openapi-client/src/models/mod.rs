//! API models

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state reported for deployments and builds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReadyState {
    Initializing,
    Analyzing,
    Building,
    Deploying,
    Ready,
    Error,
    /// Any `*_ERROR` variant, e.g. `BUILD_ERROR` or `DEPLOY_ERROR`
    Failed(String),
    /// A state this client does not know about yet
    Other(String),
}

impl ReadyState {
    pub fn as_str(&self) -> &str {
        match self {
            ReadyState::Initializing => "INITIALIZING",
            ReadyState::Analyzing => "ANALYZING",
            ReadyState::Building => "BUILDING",
            ReadyState::Deploying => "DEPLOYING",
            ReadyState::Ready => "READY",
            ReadyState::Error => "ERROR",
            ReadyState::Failed(s) | ReadyState::Other(s) => s,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ReadyState::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReadyState::Error | ReadyState::Failed(_))
    }

    /// Ready or failed
    pub fn is_done(&self) -> bool {
        self.is_ready() || self.is_failed()
    }
}

impl From<String> for ReadyState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "INITIALIZING" => ReadyState::Initializing,
            "ANALYZING" => ReadyState::Analyzing,
            "BUILDING" => ReadyState::Building,
            "DEPLOYING" => ReadyState::Deploying,
            "READY" => ReadyState::Ready,
            "ERROR" => ReadyState::Error,
            _ if s.ends_with("_ERROR") => ReadyState::Failed(s),
            _ => ReadyState::Other(s),
        }
    }
}

impl From<&str> for ReadyState {
    fn from(s: &str) -> Self {
        ReadyState::from(s.to_string())
    }
}

impl From<ReadyState> for String {
    fn from(state: ReadyState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment as returned by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub ready_state: ReadyState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// Milliseconds since the unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// One build unit inside a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: String,
    pub ready_state: ReadyState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub builder: Option<String>,
}

/// Response of the deployment builds listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildsResponse {
    #[serde(default)]
    pub builds: Vec<Build>,
}

/// One entry of the create-deployment file manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub file: String,
    pub sha: String,
    pub size: u64,
}

/// Create-deployment request body: metadata keys flattened next to `files`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDeploymentRequest {
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub files: Vec<FileRef>,
}

/// Error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

//! Error types for deployment sessions

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::deployment::ReadyState;

/// Main error type for a deployment session
#[derive(Error, Debug)]
pub enum DeploymentError {
    #[error("Unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    MissingParameter { code: &'static str, message: String },

    /// 4xx-equivalent answer from the platform, never retried
    #[error("{message} ({status})")]
    Client {
        status: u16,
        code: String,
        message: String,
    },

    /// 5xx-equivalent answer from the platform
    #[error("{message} ({status})")]
    Server {
        status: u16,
        code: String,
        message: String,
    },

    /// Connection failures, resets and timeouts
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Only Now 2.0 deployments are supported. Specify `version: 2` in your now.json and try again")]
    UnsupportedVersion { found: Option<serde_json::Value> },

    #[error("Build {id} failed with state {ready_state}")]
    BuildFailed { id: String, ready_state: ReadyState },

    #[error("Deployment {id} failed with state {ready_state}")]
    DeploymentFailed { id: String, ready_state: ReadyState },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Deployment session cancelled")]
    Cancelled,

    #[error("An unexpected error has occurred: {0}")]
    Unexpected(String),
}

impl DeploymentError {
    pub fn missing_path() -> Self {
        DeploymentError::MissingParameter {
            code: "missing_path",
            message: "Path not provided".to_string(),
        }
    }

    pub fn token_not_provided() -> Self {
        DeploymentError::MissingParameter {
            code: "token_not_provided",
            message: "Options object must include a `token`".to_string(),
        }
    }

    /// Machine-readable code
    pub fn code(&self) -> &str {
        match self {
            DeploymentError::Read { .. } => "read_error",
            DeploymentError::MissingParameter { code, .. } => *code,
            DeploymentError::Client { code, .. } | DeploymentError::Server { code, .. } => code,
            DeploymentError::Transport(e) if e.is_timeout() => "timeout",
            DeploymentError::Transport(e) if e.is_decode() => "unexpected_error",
            DeploymentError::Transport(_) => "network_error",
            DeploymentError::UnsupportedVersion { .. } => "unsupported_version",
            DeploymentError::BuildFailed { .. } => "build_failed",
            DeploymentError::DeploymentFailed { .. } => "deployment_failed",
            DeploymentError::Json(_) => "invalid_json",
            DeploymentError::Io(_) => "io_error",
            DeploymentError::Config(_) => "config_error",
            DeploymentError::Cancelled => "cancelled",
            DeploymentError::Unexpected(_) => "unexpected_error",
        }
    }

    /// Server faults and transport failures may succeed on a later attempt.
    /// A body that arrived but failed to decode will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            DeploymentError::Server { .. } => true,
            DeploymentError::Transport(e) => !e.is_decode(),
            _ => false,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<anyhow::Error> for DeploymentError {
    fn from(err: anyhow::Error) -> Self {
        DeploymentError::Unexpected(err.to_string())
    }
}

/// Structured `{code, message}` carried by the `error` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

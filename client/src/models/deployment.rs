//! Deployment models
//!
//! Wire types come from `openapi-client`; this module adds the pieces the
//! client builds locally.

pub use openapi_client::models::{
    Build, BuildsResponse, CreateDeploymentRequest, Deployment, ErrorBody, ErrorResponse,
    FileRef, ReadyState,
};

/// Major platform version this client can deploy to
pub const SUPPORTED_VERSION: i64 = 2;

/// Metadata key holding build instructions
pub const BUILDS_KEY: &str = "builds";

/// Metadata key holding the platform version marker
pub const VERSION_KEY: &str = "version";

/// Metadata key holding the deployment name
pub const NAME_KEY: &str = "name";

/// File name of the config embedded in the deployed files
pub const CONFIG_FILE_NAME: &str = "now.json";

/// Manifest submitted to create a deployment
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentManifest {
    pub files: Vec<FileRef>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DeploymentManifest {
    /// Version marker, if present and numeric
    pub fn version(&self) -> Option<i64> {
        self.metadata.get(VERSION_KEY).and_then(|v| v.as_i64())
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.get(NAME_KEY).and_then(|v| v.as_str())
    }

    pub fn into_request(self) -> CreateDeploymentRequest {
        CreateDeploymentRequest {
            metadata: self.metadata,
            files: self.files,
        }
    }
}

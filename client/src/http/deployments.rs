//! Deployment API client

use crate::errors::DeploymentError;
use crate::http::client::HttpClient;
use crate::http::API_DEPLOYMENTS;
use crate::models::deployment::{Build, BuildsResponse, CreateDeploymentRequest, Deployment};

impl HttpClient {
    /// Create a deployment. Never retried: the call is not idempotent.
    pub async fn create_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<Deployment, DeploymentError> {
        let body: serde_json::Value = self.post(API_DEPLOYMENTS, request).await?;
        serde_json::from_value(body)
            .map_err(|e| DeploymentError::Unexpected(format!("malformed deployment: {}", e)))
    }

    /// Get the current deployment descriptor
    pub async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, DeploymentError> {
        let path = format!("{}/{}", API_DEPLOYMENTS, deployment_id);
        self.get(&path).await
    }

    /// Get the builds of a deployment
    pub async fn get_deployment_builds(
        &self,
        deployment_id: &str,
    ) -> Result<Vec<Build>, DeploymentError> {
        let path = format!("{}/{}/builds", API_DEPLOYMENTS, deployment_id);
        let response: BuildsResponse = self.get(&path).await?;
        Ok(response.builds)
    }
}

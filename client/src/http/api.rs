//! Remote operations a deployment session depends on

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::DeploymentError;
use crate::http::client::HttpClient;
use crate::models::deployment::{Build, CreateDeploymentRequest, Deployment};
use crate::models::file::ContentHash;

/// Deployment platform trait for testability
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Store `data` under `fingerprint`. The store accepts content it already has.
    async fn put_content(
        &self,
        fingerprint: &ContentHash,
        data: Bytes,
    ) -> Result<(), DeploymentError>;

    /// Submit a manifest. Error answers are authoritative and must not be retried.
    async fn create_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<Deployment, DeploymentError>;

    async fn get_deployment_builds(&self, deployment_id: &str) -> Result<Vec<Build>, DeploymentError>;

    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, DeploymentError>;
}

#[async_trait]
impl DeploymentApi for HttpClient {
    async fn put_content(
        &self,
        fingerprint: &ContentHash,
        data: Bytes,
    ) -> Result<(), DeploymentError> {
        self.upload_file(fingerprint, data).await
    }

    async fn create_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<Deployment, DeploymentError> {
        HttpClient::create_deployment(self, request).await
    }

    async fn get_deployment_builds(&self, deployment_id: &str) -> Result<Vec<Build>, DeploymentError> {
        HttpClient::get_deployment_builds(self, deployment_id).await
    }

    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, DeploymentError> {
        HttpClient::get_deployment(self, deployment_id).await
    }
}

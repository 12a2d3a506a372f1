//! Content store client

use bytes::Bytes;
use reqwest::{header, Method};

use crate::errors::DeploymentError;
use crate::http::client::{check_status, HttpClient};
use crate::http::API_FILES;
use crate::models::file::ContentHash;

impl HttpClient {
    /// Upload one file's bytes under its digest. Single attempt; the caller retries.
    pub async fn upload_file(
        &self,
        fingerprint: &ContentHash,
        data: Bytes,
    ) -> Result<(), DeploymentError> {
        let length = data.len();

        let response = self
            .request(Method::POST, API_FILES)?
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header("x-now-digest", fingerprint.as_str())
            .header("x-now-length", length.to_string())
            .body(data)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

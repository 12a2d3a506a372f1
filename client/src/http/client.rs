//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::DeploymentError;
use crate::models::deployment::ErrorResponse;
use crate::utils::{retry, user_agent, RetryOptions};

/// HTTP client for the deployment platform
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
    team_id: Option<String>,
    read_retry: RetryOptions,
}

impl HttpClient {
    /// Create a new HTTP client. `timeout` bounds every request.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, DeploymentError> {
        if token.is_empty() {
            return Err(DeploymentError::token_not_provided());
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            team_id: None,
            read_retry: RetryOptions::default(),
        })
    }

    /// Scope every request to a team
    pub fn with_team_id(mut self, team_id: Option<String>) -> Self {
        self.team_id = team_id.filter(|t| !t.is_empty());
        self
    }

    /// Retry policy for read requests
    pub fn with_read_retry(mut self, options: RetryOptions) -> Self {
        self.read_retry = options;
        self
    }

    /// Absolute URL for `path`, carrying `teamId` when scoped to a team
    pub fn url(&self, path: &str) -> Result<Url, DeploymentError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| DeploymentError::Config(format!("invalid API url: {}", e)))?;

        if let Some(team_id) = &self.team_id {
            url.query_pairs_mut().append_pair("teamId", team_id);
        }

        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, DeploymentError> {
        let url = self.url(path)?;
        debug!("{} {}", method, url);

        Ok(self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token)))
    }

    /// Make a GET request, retrying transient failures
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeploymentError> {
        retry(&self.read_retry, &format!("GET {}", path), |_| async move {
            let response = self.request(Method::GET, path)?.send().await?;
            let response = check_status(response).await?;
            decode(response).await
        })
        .await
    }

    /// Make a single POST request
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeploymentError> {
        let response = self.request(Method::POST, path)?.json(body).send().await?;
        let response = check_status(response).await?;
        decode(response).await
    }
}

/// Parse a success body. A malformed body is not a transport fault.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DeploymentError> {
    response.json().await.map_err(|e| {
        if e.is_decode() {
            DeploymentError::Unexpected(format!("malformed response body: {}", e))
        } else {
            DeploymentError::Transport(e)
        }
    })
}

/// Map a non-success response onto `Client` or `Server` errors
pub(crate) async fn check_status(response: Response) -> Result<Response, DeploymentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!("HTTP request failed: {} - {}", status, body);

    Err(classify(status, &body))
}

pub(crate) fn classify(status: StatusCode, body: &str) -> DeploymentError {
    let (code, message) = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => (parsed.error.code, parsed.error.message),
        Err(_) => (
            format!("http_{}", status.as_u16()),
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.to_string()
            },
        ),
    };

    if status.is_server_error() {
        DeploymentError::Server {
            status: status.as_u16(),
            code,
            message,
        }
    } else {
        DeploymentError::Client {
            status: status.as_u16(),
            code,
            message,
        }
    }
}

//! Session configuration options

use std::time::Duration;

use crate::deploy::creator::ManifestOptions;
use crate::deploy::status::DEFAULT_POLLING_INTERVAL;
use crate::utils::RetryOptions;

/// Default API base URL
pub const DEFAULT_API_URL: &str = "https://api.zeit.co";

/// Transport options for the platform client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Backend API base URL
    pub api_base_url: String,

    /// Bound on every single request
    pub request_timeout: Duration,

    /// Retry policy for status reads
    pub read_retry: RetryOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            read_retry: RetryOptions::default(),
        }
    }
}

/// Options of one deployment session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Bearer token, required
    pub token: String,

    /// Team scope
    pub team_id: Option<String>,

    /// Manifest shaping
    pub manifest: ManifestOptions,

    /// Transport configuration
    pub client: ClientOptions,

    /// Delay between status polls
    pub polling_interval: Duration,

    /// Retry policy for content uploads
    pub upload_retry: RetryOptions,

    /// Capacity of the event channel
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            token: String::new(),
            team_id: None,
            manifest: ManifestOptions::default(),
            client: ClientOptions::default(),
            polling_interval: DEFAULT_POLLING_INTERVAL,
            upload_retry: RetryOptions::default(),
            event_capacity: 256,
        }
    }
}

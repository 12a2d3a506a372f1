//! Settings file management

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::options::{ClientOptions, DEFAULT_API_URL};
use crate::errors::DeploymentError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::utils::RetryOptions;

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Platform API configuration
    #[serde(default)]
    pub api: ApiSettings,

    /// Delay between status polls in milliseconds
    #[serde(default = "default_polling_interval")]
    pub polling_interval_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upload retry configuration
    #[serde(default)]
    pub upload: UploadSettings,
}

fn default_polling_interval() -> u64 {
    1500
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            api: ApiSettings::default(),
            polling_interval_ms: default_polling_interval(),
            request_timeout_secs: default_request_timeout(),
            upload: UploadSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from `path`; a missing file yields the defaults
    pub async fn load(path: &Path) -> Result<Self, DeploymentError> {
        let file = File::new(path);
        if !file.exists().await {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        file.read_json().await
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_base_url: self.api.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            read_retry: RetryOptions::default(),
        }
    }

    pub fn upload_retry(&self) -> RetryOptions {
        RetryOptions {
            max_attempts: self.upload.max_attempts,
            base_delay: Duration::from_millis(self.upload.base_delay_ms),
            max_delay: Duration::from_millis(self.upload.max_delay_ms),
            randomize: self.upload.randomize,
            ..RetryOptions::default()
        }
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }
}

/// Platform API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL for the platform API
    #[serde(default = "default_api_url")]
    pub base_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
        }
    }
}

/// Upload retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Attempts per file, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_true")]
    pub randomize: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            randomize: true,
        }
    }
}

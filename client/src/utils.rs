//! Utility functions

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::DeploymentError;

/// Version information for the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// User agent sent with every request
pub fn user_agent() -> String {
    format!("nowdeploy/{}", env!("CARGO_PKG_VERSION"))
}

/// Retry options for transient failures
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Scale each delay by a random factor in [1, 2)
    pub randomize: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            randomize: true,
        }
    }
}

/// Calculate the delay before retry number `attempt` (zero based)
pub fn calc_backoff(options: &RetryOptions, attempt: u32) -> Duration {
    let mut delay_secs = options.base_delay.as_secs_f64() * options.multiplier.powi(attempt as i32);
    if options.randomize {
        delay_secs *= rand::thread_rng().gen_range(1.0..2.0);
    }
    let capped_delay = delay_secs.min(options.max_delay.as_secs_f64());
    Duration::from_secs_f64(capped_delay)
}

/// Run `op` until it succeeds, fails with a non-retryable error, or runs out of attempts.
///
/// `op` receives the one-based attempt number.
pub async fn retry<T, F, Fut>(
    options: &RetryOptions,
    label: &str,
    mut op: F,
) -> Result<T, DeploymentError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DeploymentError>>,
{
    let max_attempts = options.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = calc_backoff(options, attempt - 1);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    label, attempt, max_attempts, delay, e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

//! Deployment status tracking

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::deploy::fsm::{StatusFsm, TrackerPhase};
use crate::errors::DeploymentError;
use crate::events::EventSink;
use crate::http::api::DeploymentApi;
use crate::models::deployment::Deployment;

/// Default polling interval
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(1500);

/// Polls builds, then the deployment, until a terminal state is reached
pub struct StatusTracker {
    api: Arc<dyn DeploymentApi>,
    interval: Duration,
}

impl StatusTracker {
    pub fn new(api: Arc<dyn DeploymentApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Track `deployment` until it is ready or failed.
    ///
    /// Emits build and deployment state changes as they are observed. Returns
    /// the ready deployment, or the error that ended tracking; the caller
    /// reports the terminal event. Poll failures surface after the fetch
    /// collaborator's own retries are exhausted.
    pub async fn track(
        &self,
        deployment: Deployment,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<Deployment, DeploymentError> {
        let mut fsm = StatusFsm::new(deployment);
        let id = fsm.deployment().id.clone();

        if let Some(outcome) = fsm.start() {
            debug!("Deployment {} already {}, not polling", id, fsm.deployment().ready_state);
            return outcome;
        }

        info!("Tracking deployment {}", id);

        loop {
            let polled = match fsm.phase() {
                TrackerPhase::Builds => match self.api.get_deployment_builds(&id).await {
                    Ok(builds) => fsm.observe_builds(builds),
                    Err(e) => Err(e),
                },
                TrackerPhase::Deployment => match self.api.get_deployment(&id).await {
                    Ok(update) => fsm.observe_deployment(update),
                    Err(e) => Err(e),
                },
                TrackerPhase::Finished => {
                    return Err(DeploymentError::Unexpected(format!(
                        "tracker for {} polled after finishing",
                        id
                    )))
                }
            };

            let transition = match polled {
                Ok(transition) => transition,
                Err(e) => {
                    error!("Polling deployment {} failed: {}", id, e);
                    fsm.abort();
                    return Err(e);
                }
            };

            for event in transition.events {
                events.emit(event).await?;
            }

            if let Some(outcome) = transition.outcome {
                info!("Deployment {} finished tracking", id);
                return outcome;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Tracking of {} cancelled", id);
                    return Err(DeploymentError::Cancelled);
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

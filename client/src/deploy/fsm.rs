//! State machine reconciling polled build and deployment status

use std::collections::HashMap;

use crate::errors::DeploymentError;
use crate::events::LifecycleEvent;
use crate::models::deployment::{Build, Deployment};

/// Tracker phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    /// Waiting for every build to reach a terminal state
    Builds,

    /// Waiting for the deployment itself to become ready
    Deployment,

    /// Ready or failed; nothing more is polled
    Finished,
}

/// Result of reconciling one poll
#[derive(Debug)]
pub struct Transition {
    /// Events to emit, in order
    pub events: Vec<LifecycleEvent>,

    /// Set once the tracker is finished
    pub outcome: Option<Result<Deployment, DeploymentError>>,
}

impl Transition {
    fn pending(events: Vec<LifecycleEvent>) -> Self {
        Self {
            events,
            outcome: None,
        }
    }
}

/// Last observed deployment and builds of one session
#[derive(Debug)]
pub struct StatusFsm {
    phase: TrackerPhase,
    deployment: Deployment,
    builds: HashMap<String, Build>,
    build_order: Vec<String>,
}

impl StatusFsm {
    /// Start from the descriptor returned at creation
    pub fn new(deployment: Deployment) -> Self {
        Self {
            phase: TrackerPhase::Builds,
            deployment,
            builds: HashMap::new(),
            build_order: Vec::new(),
        }
    }

    /// Get current phase
    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == TrackerPhase::Finished
    }

    /// Last observed deployment
    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Short-circuit when the deployment is terminal before any poll
    pub fn start(&mut self) -> Option<Result<Deployment, DeploymentError>> {
        let state = &self.deployment.ready_state;
        if !state.is_done() {
            return None;
        }

        self.phase = TrackerPhase::Finished;
        Some(self.deployment_outcome())
    }

    /// Reconcile a poll of the deployment's builds
    pub fn observe_builds(&mut self, builds: Vec<Build>) -> Result<Transition, DeploymentError> {
        if self.phase != TrackerPhase::Builds {
            return Err(self.invalid("builds"));
        }

        let mut events = Vec::new();

        for build in builds {
            let changed = self
                .builds
                .get(&build.id)
                .map_or(true, |prev| prev.ready_state != build.ready_state);

            if !self.builds.contains_key(&build.id) {
                self.build_order.push(build.id.clone());
            }

            if changed {
                events.push(LifecycleEvent::BuildStateChanged(build.clone()));
            }

            let failed = build.ready_state.is_failed().then(|| DeploymentError::BuildFailed {
                id: build.id.clone(),
                ready_state: build.ready_state.clone(),
            });

            self.builds.insert(build.id.clone(), build);

            if let Some(err) = failed {
                self.phase = TrackerPhase::Finished;
                return Ok(Transition {
                    events,
                    outcome: Some(Err(err)),
                });
            }
        }

        if self.builds.values().all(|b| b.ready_state.is_done()) {
            let completed = self
                .build_order
                .iter()
                .filter_map(|id| self.builds.get(id).cloned())
                .collect();
            events.push(LifecycleEvent::AllBuildsCompleted(completed));
            self.phase = TrackerPhase::Deployment;
        }

        Ok(Transition::pending(events))
    }

    /// Reconcile a poll of the deployment descriptor
    pub fn observe_deployment(&mut self, deployment: Deployment) -> Result<Transition, DeploymentError> {
        if self.phase != TrackerPhase::Deployment {
            return Err(self.invalid("deployment"));
        }

        let mut events = Vec::new();
        if deployment.ready_state != self.deployment.ready_state {
            events.push(LifecycleEvent::DeploymentStateChanged(deployment.clone()));
        }
        self.deployment = deployment;

        if !self.deployment.ready_state.is_done() {
            return Ok(Transition::pending(events));
        }

        self.phase = TrackerPhase::Finished;
        Ok(Transition {
            events,
            outcome: Some(self.deployment_outcome()),
        })
    }

    /// Stop permanently after an unrecoverable poll failure
    pub fn abort(&mut self) {
        self.phase = TrackerPhase::Finished;
    }

    fn deployment_outcome(&self) -> Result<Deployment, DeploymentError> {
        if self.deployment.ready_state.is_ready() {
            Ok(self.deployment.clone())
        } else {
            Err(DeploymentError::DeploymentFailed {
                id: self.deployment.id.clone(),
                ready_state: self.deployment.ready_state.clone(),
            })
        }
    }

    fn invalid(&self, observed: &str) -> DeploymentError {
        DeploymentError::Unexpected(format!(
            "Invalid transition: {} poll in phase {:?}",
            observed, self.phase
        ))
    }
}

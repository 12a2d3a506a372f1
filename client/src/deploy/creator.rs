//! Deployment creation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::errors::DeploymentError;
use crate::events::{EventSink, LifecycleEvent};
use crate::http::api::DeploymentApi;
use crate::models::deployment::{
    Deployment, DeploymentManifest, FileRef, BUILDS_KEY, CONFIG_FILE_NAME, NAME_KEY,
    SUPPORTED_VERSION, VERSION_KEY,
};
use crate::models::file::{FileEntry, FileSet};

/// Caller input shaping the manifest
#[derive(Debug, Clone, Default)]
pub struct ManifestOptions {
    /// Caller metadata, wins over the embedded config on key conflicts
    pub metadata: Map<String, Value>,

    /// Name used when neither metadata nor defaults provide one
    pub default_name: Option<String>,

    /// Directory the inputs were collected from. Manifest names are relative
    /// to it; without it each file is named by its last path segment.
    pub root: Option<PathBuf>,
}

/// A manifest ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestPlan {
    pub manifest: DeploymentManifest,

    /// Merged metadata when the static defaults were applied
    pub defaulted_to_static: Option<Map<String, Value>>,
}

/// Build the manifest for `files`.
///
/// Fails with `UnsupportedVersion` when the resulting version marker is not
/// the supported one; nothing is submitted in that case.
pub fn build_manifest(
    files: &FileSet,
    options: &ManifestOptions,
) -> Result<ManifestPlan, DeploymentError> {
    let first = files.first().ok_or_else(DeploymentError::missing_path)?;

    let mut metadata = embedded_config(files);
    for (key, value) in &options.metadata {
        metadata.insert(key.clone(), value.clone());
    }

    let mut defaulted_to_static = None;
    if !metadata.contains_key(BUILDS_KEY)
        && !metadata.contains_key(VERSION_KEY)
        && !metadata.contains_key(NAME_KEY)
    {
        let name = if files.len() == 1 {
            manifest_name(&first.names()[0], options.root.as_deref())
        } else {
            default_name(first)
        };

        metadata.insert(
            BUILDS_KEY.to_string(),
            json!([{ "src": "**", "use": "@now/static" }]),
        );
        metadata.insert(VERSION_KEY.to_string(), json!(SUPPORTED_VERSION));
        metadata.insert(NAME_KEY.to_string(), json!(name));
        defaulted_to_static = Some(metadata.clone());
    }

    if !metadata.contains_key(NAME_KEY) {
        let name = options
            .default_name
            .clone()
            .unwrap_or_else(|| default_name(first));
        metadata.insert(NAME_KEY.to_string(), json!(name));
    }

    let version = metadata.get(VERSION_KEY);
    if version.and_then(Value::as_i64) != Some(SUPPORTED_VERSION) {
        return Err(DeploymentError::UnsupportedVersion {
            found: version.cloned(),
        });
    }

    let root = options.root.as_deref();
    let files = files
        .iter()
        .flat_map(|entry| {
            entry.names().iter().map(move |name| FileRef {
                file: manifest_name(name, root),
                sha: entry.fingerprint().to_string(),
                size: entry.size(),
            })
        })
        .collect();

    Ok(ManifestPlan {
        manifest: DeploymentManifest { files, metadata },
        defaulted_to_static,
    })
}

/// Name of `path` inside the deployment
pub fn manifest_name(path: &str, root: Option<&Path>) -> String {
    if let Some(root) = root {
        if let Ok(relative) = Path::new(path).strip_prefix(root) {
            let segments: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            return segments.join("/");
        }
    }

    last_segment(path).to_string()
}

fn last_segment(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn default_name(first: &FileEntry) -> String {
    last_segment(&first.names()[0]).to_string()
}

/// Metadata from an embedded `now.json`, empty when absent or malformed
fn embedded_config(files: &FileSet) -> Map<String, Value> {
    let config = files
        .iter()
        .find(|entry| entry.names().iter().any(|name| name.contains(CONFIG_FILE_NAME)));

    let Some(config) = config else {
        return Map::new();
    };

    match serde_json::from_slice::<Value>(config.data()) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            warn!("{} is not a JSON object, ignoring it", CONFIG_FILE_NAME);
            Map::new()
        }
        Err(e) => {
            warn!("Unable to parse {}: {}", CONFIG_FILE_NAME, e);
            Map::new()
        }
    }
}

/// Submits manifests to the platform
pub struct DeploymentCreator {
    api: Arc<dyn DeploymentApi>,
}

impl DeploymentCreator {
    pub fn new(api: Arc<dyn DeploymentApi>) -> Self {
        Self { api }
    }

    /// Build and submit the manifest, emitting `default-to-static` and `created`.
    ///
    /// An error answer from the platform is returned as-is, never retried.
    pub async fn create(
        &self,
        files: &FileSet,
        options: &ManifestOptions,
        events: &EventSink,
    ) -> Result<Deployment, DeploymentError> {
        let plan = build_manifest(files, options)?;

        if let Some(metadata) = plan.defaulted_to_static {
            info!("No build configuration found, defaulting to a static deployment");
            events.emit(LifecycleEvent::DefaultToStatic(metadata)).await?;
        }

        let manifest = plan.manifest;
        info!(
            "Creating deployment {} with {} files",
            manifest.name().unwrap_or_default(),
            manifest.files.len()
        );

        let deployment = self.api.create_deployment(&manifest.into_request()).await?;
        info!(
            "Deployment {} created ({})",
            deployment.id, deployment.ready_state
        );

        events.emit(LifecycleEvent::Created(deployment.clone())).await?;
        Ok(deployment)
    }
}

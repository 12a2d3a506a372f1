//! Platform API access

pub mod api;
pub mod client;
pub mod deployments;
pub mod files;

/// Content store endpoint
pub const API_FILES: &str = "/v2/now/files";

/// Deployments endpoint
pub const API_DEPLOYMENTS: &str = "/v9/now/deployments";

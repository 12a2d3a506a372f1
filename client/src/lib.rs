//! nowdeploy library
//!
//! Uploads content-addressed files to a deployment platform, creates a
//! deployment from them and tracks it until it is ready.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod events;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod storage;
pub mod utils;

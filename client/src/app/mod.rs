//! Deployment session orchestration

pub mod options;
pub mod session;

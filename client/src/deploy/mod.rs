//! Deployment pipeline: fingerprint, upload, create, track

pub mod creator;
pub mod fsm;
pub mod hashes;
pub mod status;
pub mod upload;

//! Wire models for the deployment platform API

pub mod models;
